//! Session state machine for one phx42 connection
//!
//! A session owns an already-open byte stream and runs two concurrent
//! activities over it: a dispatch loop that turns inbound lines into
//! [`Event`]s, and a heartbeat driver that walks the device through its
//! fixed setup sequence and then keeps the link alive with periodic
//! CHEK commands. The transport's write side is the only shared mutable
//! resource; every send path goes through one mutex so lines are never
//! interleaved on the wire.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace, warn};

use crate::protocol::{EncodeError, Message, MessageKind, param};

use super::{ConnectionError, Event, EventStream, FrameReader, TransportError};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Session tuning knobs.
///
/// The defaults reproduce the pacing the phx42 firmware expects; they
/// exist as fields so tests can compress the timeline, not so products
/// can reorder the setup contract.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Serial of the target unit, used in status text (`phx42-<serial>`).
    pub serial: String,
    /// Delay between setup commands, so the device input buffer is
    /// never overrun.
    pub setup_pacing: Duration,
    /// Interval between CHEK heartbeats. Anything under a second is
    /// fine for the firmware.
    pub heartbeat_interval: Duration,
    /// Periodic telemetry rate requested via TRPT, in milliseconds.
    pub telemetry_interval_ms: u32,
    /// Optional liveness window: a stream silent for this long is
    /// treated as a lost transport. Off by default, matching the
    /// reference behavior of detecting loss only via stream errors.
    pub read_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Configuration for a unit with the given serial and stock pacing.
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            setup_pacing: Duration::from_millis(200),
            heartbeat_interval: Duration::from_millis(900),
            telemetry_interval_ms: 1000,
            read_timeout: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

struct Shared {
    serial: String,
    writer: Mutex<BoxedWriter>,
    state: AtomicU8,
    last_heartbeat: std::sync::Mutex<Option<Instant>>,
    events: mpsc::UnboundedSender<Event>,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn swap_state(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.state.swap(state as u8, Ordering::AcqRel))
    }

    fn emit(&self, event: Event) {
        // The receiver going away just means the collaborator stopped
        // listening; the session keeps running until closed.
        let _ = self.events.send(event);
    }

    fn status(&self, text: impl Into<String>) {
        self.emit(Event::Status(text.into()));
    }

    async fn write_line(&self, message: &Message) -> Result<(), TransportError> {
        let line = message.encode();
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(TransportError::Write)?;
        // Flush immediately so commands are never sitting in a buffer.
        writer.flush().await.map_err(TransportError::Write)?;
        trace!(line = line.trim_end(), "sent");
        Ok(())
    }

    /// Send from a background task; a failure tears the session down.
    async fn try_send(&self, message: &Message) -> bool {
        match self.write_line(message).await {
            Ok(()) => true,
            Err(err) => {
                self.transport_lost(&err);
                false
            }
        }
    }

    /// Fatal transport failure: first caller wins the state transition,
    /// reports it, and wakes both background tasks.
    fn transport_lost(&self, error: &TransportError) {
        if self.swap_state(ConnectionState::Disconnected) == ConnectionState::Disconnected {
            return;
        }
        warn!(serial = %self.serial, %error, "transport lost");
        self.status(format!("Lost connection to phx42-{}: {error}", self.serial));
        // send_replace stores the flag even when no task has subscribed
        // yet, so a teardown racing task startup is never lost.
        self.shutdown.send_replace(true);
    }

    fn dispatch(&self, message: &Message) {
        let Some(kind) = message.kind() else {
            trace!(
                message_type = message.message_type(),
                "ignoring unhandled message type"
            );
            return;
        };

        match kind {
            MessageKind::Heartbeat => {
                if let Ok(mut last) = self.last_heartbeat.lock() {
                    *last = Some(Instant::now());
                }
                self.emit(Event::Heartbeat);
            }
            MessageKind::FidReadings => {
                if let Some(ppm) = message.param(param::CALPPM) {
                    self.emit(Event::Ppm(ppm.to_owned()));
                }
            }
            MessageKind::SpontaneousError | MessageKind::Error => {
                let detail = message
                    .param(param::CODE)
                    .or_else(|| message.extra())
                    .unwrap_or_default();
                self.emit(Event::DeviceError(detail.to_owned()));
            }
            MessageKind::Shutdown => {
                self.emit(Event::Flameout(message.extra().unwrap_or_default().to_owned()));
            }
            MessageKind::FirmwareVersion => {
                let major = message.param(param::MAJOR).unwrap_or("?");
                let minor = message.param(param::MINOR).unwrap_or("?");
                self.emit(Event::FirmwareVersion(format!("{major}.{minor}")));
            }
            MessageKind::SetTime
            | MessageKind::TelemetryRate
            | MessageKind::PeriodicReport
            | MessageKind::Ignite => {
                trace!(%kind, "no inbound action for command kind");
            }
        }
    }
}

/// Handle to one live connection.
///
/// Dropping the handle aborts both background activities; [`close`]
/// does the same gracefully and tells the collaborator.
///
/// [`close`]: Session::close
pub struct Session {
    shared: Arc<Shared>,
    dispatch_task: JoinHandle<()>,
    heartbeat_task: JoinHandle<()>,
}

impl Session {
    /// Bring a session up over an already-open bidirectional stream.
    ///
    /// The first setup command (TIME, with the current local clock) is
    /// written before this returns: the device clock must be set before
    /// other commands are meaningful, and a dead transport fails here as
    /// a [`ConnectionError`] with no background activity left running.
    /// On success the remaining setup sequence and the heartbeat loop
    /// run in the background, and inbound traffic is dispatched onto the
    /// returned [`EventStream`].
    pub async fn open<T>(
        transport: T,
        config: SessionConfig,
    ) -> Result<(Self, EventStream), ConnectionError>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);
        let (read_half, write_half) = tokio::io::split(transport);

        let shared = Arc::new(Shared {
            serial: config.serial.clone(),
            writer: Mutex::new(Box::new(write_half)),
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            last_heartbeat: std::sync::Mutex::new(None),
            events: events_tx,
            shutdown: shutdown_tx,
        });

        if let Err(source) = shared.write_line(&set_time_command()).await {
            shared.set_state(ConnectionState::Disconnected);
            return Err(ConnectionError::Handshake {
                serial: config.serial,
                source,
            });
        }

        shared.set_state(ConnectionState::Connected);
        shared.status(format!("Connected to phx42-{}", shared.serial));
        debug!(serial = %shared.serial, "session connected");

        let reader = FrameReader::new(Box::new(read_half) as BoxedReader);
        let dispatch_task = tokio::spawn(dispatch_loop(
            reader,
            Arc::clone(&shared),
            config.read_timeout,
        ));
        let heartbeat_task = tokio::spawn(heartbeat_loop(Arc::clone(&shared), config));

        Ok((
            Self {
                shared,
                dispatch_task,
                heartbeat_task,
            },
            events_rx,
        ))
    }

    /// Whether the session is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.state() == ConnectionState::Connected
    }

    /// When the most recent CHEK acknowledgment arrived, if any.
    ///
    /// The engine imposes no liveness policy of its own; collaborators
    /// interpret staleness here if they want one.
    #[must_use]
    pub fn last_heartbeat(&self) -> Option<Instant> {
        self.shared.last_heartbeat.lock().ok().and_then(|last| *last)
    }

    /// Send a message to the unit, fire-and-forget.
    ///
    /// Silently does nothing unless the session is Connected; UI actions
    /// racing a disconnect are expected and not an error. A write
    /// failure tears the session down and surfaces as a status event.
    #[instrument(level = "debug", skip(self, message), fields(message_type = message.message_type()))]
    pub async fn send(&self, message: Message) {
        if self.shared.state() != ConnectionState::Connected {
            trace!("not connected, dropping outbound message");
            return;
        }
        if let Err(err) = self.shared.write_line(&message).await {
            self.shared.transport_lost(&err);
        }
    }

    /// Build and send a command from a raw type token and optional
    /// payload fields.
    ///
    /// Transport absence is never an error here, but an ill-formed
    /// message (both parameters and extra supplied) is surfaced to the
    /// caller immediately and nothing is written.
    pub async fn send_command(
        &self,
        message_type: &str,
        params: Option<BTreeMap<String, String>>,
        extra: Option<String>,
    ) -> Result<(), EncodeError> {
        let message = Message::to_unit(message_type, params, extra)?;
        self.send(message).await;
        Ok(())
    }

    /// Fire the igniter (`AIGS GO=1`).
    pub async fn ignite(&self) {
        let mut params = BTreeMap::new();
        params.insert(param::GO.to_owned(), "1".to_owned());
        self.send(Message::command_with_params(MessageKind::Ignite, params))
            .await;
    }

    /// Tear the session down.
    ///
    /// Idempotent: the first call wakes and terminates both background
    /// activities, shuts the write side down, and emits a Disconnected
    /// status; later calls (or a close racing a transport loss) do
    /// nothing.
    pub async fn close(&self) {
        if self.shared.swap_state(ConnectionState::Disconnected)
            == ConnectionState::Disconnected
        {
            return;
        }

        self.shared.shutdown.send_replace(true);
        {
            let mut writer = self.shared.writer.lock().await;
            let _ = writer.shutdown().await;
        }
        self.shared.status("Disconnected");
        debug!(serial = %self.shared.serial, "session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.shutdown.send_replace(true);
        self.dispatch_task.abort();
        self.heartbeat_task.abort();
    }
}

/// Current local clock in the device's `yyyy/MM/dd_HH:mm:ss` format.
fn set_time_command() -> Message {
    let clock = Local::now().format("%Y/%m/%d_%H:%M:%S").to_string();
    let mut params = BTreeMap::new();
    params.insert(param::MS.to_owned(), clock);
    Message::command_with_params(MessageKind::SetTime, params)
}

/// Resolves once shutdown is signalled.
async fn shutdown_signal(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Cancellable pacing delay; false means shutdown arrived first.
async fn pause(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        biased;
        () = shutdown_signal(shutdown) => false,
        () = tokio::time::sleep(duration) => true,
    }
}

/// Reads framed lines and routes them to the event sink until the
/// stream ends, a transport error occurs, or the session closes.
/// Inbound messages are dispatched in arrival order.
async fn dispatch_loop(
    mut reader: FrameReader<BoxedReader>,
    shared: Arc<Shared>,
    read_timeout: Option<Duration>,
) {
    let mut shutdown = shared.shutdown.subscribe();

    loop {
        // Biased so a close racing inbound traffic always terminates the
        // loop instead of dispatching one more line.
        let next = tokio::select! {
            biased;
            () = shutdown_signal(&mut shutdown) => break,
            next = next_line(&mut reader, read_timeout) => next,
        };

        match next {
            Ok(Some(line)) => match Message::parse(&line) {
                Ok(message) => shared.dispatch(&message),
                // Malformed lines are discarded, never fatal.
                Err(err) => {
                    warn!(%line, %err, "discarding malformed line");
                    shared.status(format!("Ignoring malformed message: {err}"));
                }
            },
            Ok(None) => {
                shared.transport_lost(&TransportError::Closed);
                break;
            }
            Err(err) => {
                shared.transport_lost(&err);
                break;
            }
        }
    }

    debug!("dispatch loop stopped");
}

async fn next_line(
    reader: &mut FrameReader<BoxedReader>,
    read_timeout: Option<Duration>,
) -> Result<Option<String>, TransportError> {
    match read_timeout {
        None => reader.next_line().await,
        Some(window) => tokio::time::timeout(window, reader.next_line())
            .await
            .map_err(|_| TransportError::ReadTimeout(window))?,
    }
}

/// Finishes the paced setup sequence (TIME went out during open) and
/// then heartbeats until the session ends. Order and pacing are a
/// firmware contract: time, version request, telemetry rate, periodic
/// FID reports, then CHEK forever.
async fn heartbeat_loop(shared: Arc<Shared>, config: SessionConfig) {
    let mut shutdown = shared.shutdown.subscribe();

    let mut telemetry = BTreeMap::new();
    telemetry.insert(
        param::MS.to_owned(),
        config.telemetry_interval_ms.to_string(),
    );
    let mut periodic = BTreeMap::new();
    periodic.insert(
        param::TYPE.to_owned(),
        MessageKind::FidReadings.token().to_owned(),
    );
    periodic.insert(param::EN.to_owned(), "1".to_owned());

    let setup = [
        Message::command(MessageKind::FirmwareVersion),
        Message::command_with_params(MessageKind::TelemetryRate, telemetry),
        Message::command_with_params(MessageKind::PeriodicReport, periodic),
    ];

    for command in setup {
        if !pause(&mut shutdown, config.setup_pacing).await {
            return;
        }
        if !shared.try_send(&command).await {
            return;
        }
    }

    // First CHEK follows the setup pacing, not a full heartbeat
    // interval; the sleep comes after each send.
    if !pause(&mut shutdown, config.setup_pacing).await {
        return;
    }
    loop {
        if !shared.try_send(&Message::command(MessageKind::Heartbeat)).await {
            break;
        }
        if !pause(&mut shutdown, config.heartbeat_interval).await {
            break;
        }
    }

    debug!("heartbeat loop stopped");
}
