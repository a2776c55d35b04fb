//! Events delivered from a session to the host application
//!
//! The engine never touches UI or platform marshalling; it pushes typed
//! events down an unbounded channel and the collaborator decides how to
//! move them onto its own execution context.

use tokio::sync::mpsc;

/// Receiving end of a session's event channel.
pub type EventStream = mpsc::UnboundedReceiver<Event>;

/// A typed notification from the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Human-readable status change (connected, disconnected, transport
    /// loss, recovered protocol warnings). Never a raw error dump.
    Status(String),

    /// A CHEK acknowledgment arrived; suitable for pulsing a liveness
    /// indicator.
    Heartbeat,

    /// Calibrated PPM concentration from a FIDR reading, as reported.
    Ppm(String),

    /// Firmware version in `MAJOR.MINOR` form.
    FirmwareVersion(String),

    /// Device-reported error (SERR/EROR), code or description text.
    DeviceError(String),

    /// Flameout shutdown notification (SHUT) with its description.
    Flameout(String),
}
