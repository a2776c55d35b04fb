//! phx42 session layer
//!
//! Framing, event dispatch, and the connection state machine that keeps
//! a live session fed with the setup/heartbeat command sequence.

mod error;
mod event;
mod framing;
mod session;

pub use error::{ConnectionError, TransportError};
pub use event::{Event, EventStream};
pub use framing::FrameReader;
pub use session::{Session, SessionConfig};
