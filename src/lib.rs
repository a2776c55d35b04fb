//! Protocol engine for the phx42 flame-ionization analyzer.
//!
//! This library implements the text line protocol spoken by phx42 units
//! over a serial byte stream: framing, message encode/decode, and the
//! session state machine that runs the setup/heartbeat sequence and
//! dispatches device traffic as typed events.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use phx42::{Session, SessionConfig, Event};
//!
//! # async fn run(stream: tokio::io::DuplexStream) -> Result<(), Box<dyn std::error::Error>> {
//! // `stream` is any already-open AsyncRead + AsyncWrite transport.
//! let config = SessionConfig::new("2124");
//! let (session, mut events) = Session::open(stream, config).await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         Event::Ppm(value) => println!("PPM: {value}"),
//!         Event::Status(text) => println!("{text}"),
//!         _ => {}
//!     }
//! }
//!
//! session.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Layers
//!
//! - [`protocol`] - the stateless wire codec (`ZUzu`/`YTyt` tagged lines)
//! - [`session`] - framing reader, heartbeat driver, and event dispatch

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod protocol;
pub mod session;

pub use protocol::{
    Direction, EncodeError, HOST_TO_UNIT_TAG, Message, MessageKind, ParseError, Payload,
    TERMINATOR, UNIT_TO_HOST_TAG,
};
pub use session::{
    ConnectionError, Event, EventStream, FrameReader, Session, SessionConfig, TransportError,
};
