//! phx42 wire protocol core
//!
//! This module provides the message model and line codec for the phx42
//! text protocol. It holds no I/O and no state; framing and session
//! logic live in [`crate::session`].

mod codec;
mod error;
mod message;
mod types;

pub use codec::{decode, encode};
pub use error::{EncodeError, ParseError};
pub use message::{Direction, Message, Payload};
pub use types::{MessageKind, param};

/// Direction tag on messages sent from the host to the unit.
pub const HOST_TO_UNIT_TAG: &str = "ZUzu";

/// Direction tag on messages sent from the unit to the host.
pub const UNIT_TO_HOST_TAG: &str = "YTyt";

/// Line terminator, exactly once per message.
pub const TERMINATOR: &str = "\r\n";
