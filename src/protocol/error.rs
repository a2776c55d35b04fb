//! phx42 protocol error types

use thiserror::Error;

/// Errors raised while parsing an inbound protocol line.
///
/// Parse failures are recoverable: the session discards the offending
/// line and keeps reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line is missing the direction tag or the type field.
    #[error("truncated line {line:?}: expected '<tag> <type> [params] [extra]'")]
    Truncated {
        /// The offending line, terminator stripped.
        line: String,
    },

    /// A parameter segment did not split into exactly one `NAME=VALUE` pair.
    #[error("malformed parameter {segment:?}: expected 'NAME1=VALUE1,NAME2=VALUE2,...'")]
    MalformedParameter {
        /// The comma-delimited segment that failed to split.
        segment: String,
    },
}

/// Errors raised while building an outbound message.
///
/// These are caller bugs, surfaced immediately; nothing is written to
/// the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Both a parameter map and an extra token were supplied; the wire
    /// grammar's third field carries one or the other, never both.
    #[error("message type {message_type:?} carries both parameters and an extra token")]
    ConflictingPayload {
        /// Type token of the rejected message.
        message_type: String,
    },

    /// The message type token was empty.
    #[error("message type must be a non-empty token")]
    EmptyType,
}
