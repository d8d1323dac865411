//! Session Client
//!
//! Runs one Wired session on a dedicated thread.
//!
//! ## Threads
//! - session thread: owns the [`Session`] and the transport writer; the
//!   only place session state changes
//! - reader thread (one per transport): frames, decodes, forwards
//! - watchdog thread (one per transport): forwards keepalive ticks
//!
//! Reader and watchdog events are tagged with the transport generation.
//! Both threads are stopped and joined before a new transport is opened,
//! and anything still queued from an old generation is dropped.

use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::RwLock;

use crate::catalog::SpecCatalog;
use crate::config::Config;
use crate::error::{Result, WiredError};
use crate::notify::Notifier;
use crate::protocol::{decode_message, FrameReader, Message, Transaction};
use crate::session::{FailureOutcome, Session, SessionAction, SessionSnapshot, Watchdog};

use super::clock::{Clock, SystemClock};
use super::connection::{Connector, TcpConnector, Transport};

/// Shared, read-only view of the latest session snapshot
#[derive(Debug, Clone, Default)]
pub struct SnapshotCell(Arc<RwLock<SessionSnapshot>>);

impl SnapshotCell {
    pub fn get(&self) -> SessionSnapshot {
        self.0.read().clone()
    }

    fn set(&self, snapshot: SessionSnapshot) {
        *self.0.write() = snapshot;
    }
}

/// Everything that can wake the session thread
#[derive(Debug)]
enum Event {
    Inbound { generation: u64, message: Message },
    ReadFailed { generation: u64, error: WiredError },
    WatchdogTick { generation: u64 },
    Disconnect,
}

// =============================================================================
// Client
// =============================================================================

/// Builder for a running session
pub struct Client {
    session: Session,
    notifier: Arc<dyn Notifier>,
    connector: Box<dyn Connector>,
    clock: Arc<dyn Clock>,
    snapshot: SnapshotCell,
}

impl Client {
    /// A client that connects over TCP on the wall clock
    pub fn new(config: Config, catalog: Arc<SpecCatalog>, notifier: Arc<dyn Notifier>) -> Self {
        let session = Session::new(Arc::new(config), catalog);
        let snapshot = SnapshotCell::default();
        snapshot.set(session.state().snapshot());

        Self {
            session,
            notifier,
            connector: Box::new(TcpConnector),
            clock: Arc::new(SystemClock),
            snapshot,
        }
    }

    /// Replace the transport factory
    pub fn with_connector<C: Connector + 'static>(mut self, connector: C) -> Self {
        self.connector = Box::new(connector);
        self
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Snapshot view that stays valid after `start`
    pub fn snapshots(&self) -> SnapshotCell {
        self.snapshot.clone()
    }

    /// Spawn the session thread and make the first connection attempt
    pub fn start(self) -> Result<ClientHandle> {
        self.session.config().validate()?;

        let (events_tx, events_rx) = channel::unbounded();
        let snapshot = self.snapshot.clone();

        let driver = Driver {
            session: self.session,
            notifier: self.notifier,
            connector: self.connector,
            clock: self.clock,
            events_tx: events_tx.clone(),
            events_rx,
            snapshot: self.snapshot,
            link: None,
            generation: 0,
        };

        let join = thread::Builder::new()
            .name("wired-session".to_string())
            .spawn(move || driver.run())?;

        Ok(ClientHandle {
            events_tx,
            snapshot,
            join: Some(join),
        })
    }
}

/// Control handle for a running session
///
/// Dropping the handle disconnects.
pub struct ClientHandle {
    events_tx: Sender<Event>,
    snapshot: SnapshotCell,
    join: Option<JoinHandle<Result<()>>>,
}

impl ClientHandle {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.get()
    }

    /// True once the session thread has exited
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    /// Say goodbye to the server and stop
    ///
    /// Returns the session's own error if it had already failed.
    pub fn disconnect(mut self) -> Result<()> {
        let _ = self.events_tx.send(Event::Disconnect);
        self.join_session()
    }

    /// Block until the session ends on its own
    pub fn wait(mut self) -> Result<()> {
        self.join_session()
    }

    fn join_session(&mut self) -> Result<()> {
        match self.join.take() {
            Some(join) => join
                .join()
                .unwrap_or_else(|_| Err(WiredError::Transport("session thread panicked".to_string()))),
            None => Ok(()),
        }
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            let _ = self.events_tx.send(Event::Disconnect);
            if let Err(e) = self.join_session() {
                tracing::debug!("Session ended with error: {}", e);
            }
        }
    }
}

// =============================================================================
// Session Thread
// =============================================================================

/// How a served connection ended
enum Served {
    /// Disconnect requested
    Closed,
    /// Transport failure; hand over to the reconnect policy
    Lost(WiredError),
}

/// The live transport and the threads bound to it
struct Link {
    generation: u64,
    transport: Box<dyn Transport>,
    reader: Option<JoinHandle<()>>,
    watchdog: Watchdog,
}

impl Link {
    fn close(mut self) {
        self.watchdog.stop();
        self.transport.shutdown();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        tracing::debug!(generation = self.generation, "Transport closed");
    }
}

struct Driver {
    session: Session,
    notifier: Arc<dyn Notifier>,
    connector: Box<dyn Connector>,
    clock: Arc<dyn Clock>,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
    snapshot: SnapshotCell,
    link: Option<Link>,
    generation: u64,
}

impl Driver {
    fn run(mut self) -> Result<()> {
        let result = self.run_session();
        self.close_link();
        self.publish();

        match &result {
            Ok(()) => tracing::info!("Session closed"),
            Err(e) => tracing::error!("{}", e),
        }
        result
    }

    fn run_session(&mut self) -> Result<()> {
        loop {
            let lost = match self.open() {
                Ok(()) => match self.serve()? {
                    Served::Closed => return Ok(()),
                    Served::Lost(error) => error,
                },
                Err(error) if error.is_transport() => error,
                Err(error) => return Err(error),
            };

            tracing::warn!(attempt = self.session.state().attempt, "Connection lost: {}", lost);
            self.close_link();

            match self.session.transport_failed() {
                FailureOutcome::Retry { attempt, delay } => {
                    self.publish();
                    tracing::info!("Reconnecting in {:?}. Attempt {}.", delay, attempt);
                    if !self.wait_before_retry(delay) {
                        self.session.disconnect();
                        return Ok(());
                    }
                }
                FailureOutcome::GiveUp(fatal) => return Err(fatal.into()),
            }
        }
    }

    /// Open a transport, start its threads, send the handshake
    fn open(&mut self) -> Result<()> {
        let attempt = self.session.begin_attempt();
        self.publish();

        let config = self.session.config();
        let address = config.address();
        let timeout = config.connect_timeout;
        let interval = config.keepalive_interval;

        tracing::info!(attempt, "Connecting to {}", address);
        let transport = self
            .connector
            .connect(&address, timeout)
            .map_err(|e| WiredError::Transport(format!("connect to {} failed: {}", address, e)))?;
        let reader = transport.reader()?;

        self.generation += 1;
        let generation = self.generation;

        let events = self.events_tx.clone();
        let reader = thread::Builder::new()
            .name(format!("wired-reader-{}", generation))
            .spawn(move || run_reader(reader, generation, events))?;

        let ticks = self.events_tx.clone();
        let watchdog = Watchdog::start(interval, move || {
            ticks.send(Event::WatchdogTick { generation }).is_ok()
        })?;

        tracing::info!(attempt, "Connected to {}", transport.peer());
        self.link = Some(Link {
            generation,
            transport,
            reader: Some(reader),
            watchdog,
        });

        let actions = self.session.transport_opened();
        self.publish();
        self.apply(actions)
    }

    /// Dispatch events until the connection ends
    fn serve(&mut self) -> Result<Served> {
        loop {
            let event = match self.events_rx.recv() {
                Ok(event) => event,
                Err(_) => return Ok(Served::Closed),
            };

            let outcome = match event {
                Event::Inbound { generation, message } if self.is_current(generation) => {
                    let actions = self.session.handle_message(&message, self.clock.now());
                    self.apply(actions)
                }
                Event::WatchdogTick { generation } if self.is_current(generation) => {
                    let actions = self.session.watchdog_tick(self.clock.now());
                    self.apply(actions)
                }
                Event::ReadFailed { generation, error } if self.is_current(generation) => Err(error),
                Event::Disconnect => {
                    self.disconnect();
                    return Ok(Served::Closed);
                }
                _ => {
                    tracing::trace!("Dropping event from a closed transport");
                    Ok(())
                }
            };
            self.publish();

            match outcome {
                Ok(()) => {}
                Err(e) if e.is_transport() => return Ok(Served::Lost(e)),
                Err(e) => return Err(e),
            }
        }
    }

    /// Sleep out the retry delay; false if a disconnect arrived meanwhile
    fn wait_before_retry(&mut self, delay: Duration) -> bool {
        let timer = self.clock.timer(delay);

        loop {
            crossbeam::select! {
                recv(timer) -> _ => return true,
                recv(self.events_rx) -> event => match event {
                    Ok(Event::Disconnect) | Err(_) => return false,
                    Ok(_) => {}
                },
            }
        }
    }

    fn disconnect(&mut self) {
        tracing::info!("Disconnecting from server");
        let actions = self.session.disconnect();
        if let Err(e) = self.apply(actions) {
            tracing::warn!("Could not send disconnect notice: {}", e);
        }
        self.close_link();
    }

    fn apply(&mut self, actions: Vec<SessionAction>) -> Result<()> {
        for action in actions {
            match action {
                SessionAction::Send(transaction) => self.send(&transaction)?,
                SessionAction::Notify(notification) => self.notifier.notify(notification),
                SessionAction::Fatal(fatal) => return Err(fatal.into()),
            }
        }
        Ok(())
    }

    fn send(&mut self, transaction: &Transaction) -> Result<()> {
        let link = self.link.as_mut().ok_or(WiredError::TransportClosed)?;

        link.transport
            .write_frame(&transaction.encode())
            .map_err(|e| WiredError::Transport(format!("write of {} failed: {}", transaction.name(), e)))?;

        tracing::debug!(generation = link.generation, "Sent {}", transaction.name());
        Ok(())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.link.as_ref().is_some_and(|link| link.generation == generation)
    }

    fn close_link(&mut self) {
        if let Some(link) = self.link.take() {
            link.close();
        }
    }

    fn publish(&self) {
        self.snapshot.set(self.session.state().snapshot());
    }
}

/// Reader thread body: frame, decode, forward
fn run_reader(reader: Box<dyn Read + Send>, generation: u64, events: Sender<Event>) {
    let mut frames = FrameReader::new(reader);

    loop {
        match frames.read_frame() {
            Ok(frame) => match decode_message(&frame) {
                Ok(message) => {
                    tracing::trace!(generation, "Received {}", message.name);
                    if events.send(Event::Inbound { generation, message }).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(generation, "Dropping undecodable frame: {}", e);
                    tracing::trace!("Frame: {}", String::from_utf8_lossy(&frame));
                }
            },
            Err(error) => {
                let _ = events.send(Event::ReadFailed { generation, error });
                break;
            }
        }
    }
}
