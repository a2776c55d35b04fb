//! Session-level error types

use thiserror::Error;

/// Transport failures. Any of these is fatal to the session: the state
/// machine transitions to Disconnected and releases the stream.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Read side of the stream failed.
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    /// Write side of the stream failed.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The stream closed while a session still held it.
    #[error("transport closed by peer")]
    Closed,

    /// No bytes arrived within the configured liveness window.
    #[error("no data received within {0:?}")]
    ReadTimeout(std::time::Duration),
}

/// Failure to bring a session up. The session never reaches Connected
/// and no background activity is left running.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The opening handshake command could not be written.
    #[error("handshake with phx42-{serial} failed: {source}")]
    Handshake {
        /// Serial filter of the target unit.
        serial: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
}
