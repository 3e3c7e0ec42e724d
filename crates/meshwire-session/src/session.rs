use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use meshwire_frame::{frame_queue, FrameReader, FrameSender, FrameWriter};
use meshwire_transport::{SerialConfig, SerialTransport, Transport};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::dispatcher::Dispatcher;
use crate::envelope::{MessageCodec, ProtobufCodec, Request};
use crate::error::{Result, SessionError};
use crate::message::{MyNodeInfo, RadioConfig};
use crate::state::{HandshakeStatus, HandshakeWait, SessionState};
use crate::topic::{Event, Topic, TopicRegistry};

const READER_THREAD: &str = "meshwire-reader";
const DISPATCH_THREAD: &str = "meshwire-dispatch";

/// Lifecycle of a [`Session`]. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Closed => "closed",
        })
    }
}

/// A connection to one radio.
///
/// `connect` opens the transport and starts two background threads: a reader
/// (transport → decoder → frame queue) and a dispatcher (queue → codec →
/// state cache and topic subscribers). Requests are written on the caller's
/// thread.
pub struct Session {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn MessageCodec>,
    config: SessionConfig,
    writer: Mutex<FrameWriter<Arc<dyn Transport>>>,
    state: Arc<SessionState>,
    topics: Arc<TopicRegistry>,
    status: Mutex<SessionStatus>,
    stop: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Create a session over `transport` with the protobuf codec and default
    /// config.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::build(transport, ProtobufCodec, SessionConfig::default())
    }

    /// Create a session with the protobuf codec and explicit settings.
    ///
    /// Fails with [`SessionError::Config`] if `config` does not validate.
    pub fn with_config(
        transport: impl Transport + 'static,
        config: SessionConfig,
    ) -> Result<Self> {
        Self::with_codec(transport, ProtobufCodec, config)
    }

    /// Create a session with a custom message codec.
    pub fn with_codec(
        transport: impl Transport + 'static,
        codec: impl MessageCodec + 'static,
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(transport, codec, config))
    }

    /// Create a session on a serial port.
    pub fn serial(serial: SerialConfig, config: SessionConfig) -> Result<Self> {
        Self::with_config(SerialTransport::new(serial), config)
    }

    fn build(
        transport: impl Transport + 'static,
        codec: impl MessageCodec + 'static,
        config: SessionConfig,
    ) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let writer = FrameWriter::with_config(Arc::clone(&transport), config.frame_config());
        Self {
            transport,
            codec: Arc::new(codec),
            config,
            writer: Mutex::new(writer),
            state: Arc::new(SessionState::new()),
            topics: Arc::new(TopicRegistry::new()),
            status: Mutex::new(SessionStatus::Disconnected),
            stop: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Open the transport, start the workers and request the radio's config.
    ///
    /// Returns the handshake nonce once `WantConfigId` is written; it does not
    /// wait for the radio. See [`wait_for_handshake`](Self::wait_for_handshake).
    pub fn connect(&self) -> Result<u32> {
        {
            let mut status = self.lock_status();
            match *status {
                SessionStatus::Disconnected => *status = SessionStatus::Connecting,
                SessionStatus::Connecting | SessionStatus::Connected => {
                    return Err(SessionError::AlreadyConnected)
                }
                SessionStatus::Closed => return Err(SessionError::Closed),
            }
        }

        match self.start() {
            Ok(nonce) => {
                let mut status = self.lock_status();
                if *status == SessionStatus::Closed {
                    drop(status);
                    self.stop_workers();
                    return Err(SessionError::Closed);
                }
                *status = SessionStatus::Connected;
                info!(transport = self.transport.name(), nonce, "session connected");
                Ok(nonce)
            }
            Err(err) => {
                let mut status = self.lock_status();
                if *status == SessionStatus::Connecting {
                    *status = SessionStatus::Disconnected;
                }
                warn!(transport = self.transport.name(), "connect failed: {err}");
                Err(err)
            }
        }
    }

    fn start(&self) -> Result<u32> {
        self.transport.open()?;
        self.stop.store(false, Ordering::Release);

        if let Err(err) = self.spawn_workers() {
            self.stop_workers();
            return Err(err);
        }

        let nonce = rand::random::<u32>();
        self.state.begin_handshake(nonce);
        debug!(nonce, "requesting radio config");
        if let Err(err) = self.write_request(&Request::WantConfigId(nonce)) {
            self.stop_workers();
            return Err(err);
        }
        Ok(nonce)
    }

    fn spawn_workers(&self) -> Result<()> {
        let (tx, rx) = frame_queue(self.config.queue_capacity);

        let reader = FrameReader::with_config(
            Arc::clone(&self.transport),
            &self.config.frame_config(),
        );
        let stop = Arc::clone(&self.stop);
        let reader_handle = thread::Builder::new()
            .name(READER_THREAD.to_string())
            .spawn(move || read_loop(reader, &tx, &stop))
            .map_err(SessionError::Spawn)?;
        self.lock_workers().push(reader_handle);

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.codec),
            Arc::clone(&self.state),
            Arc::clone(&self.topics),
        );
        let state = Arc::clone(&self.state);
        let stop = Arc::clone(&self.stop);
        let poll = self.config.poll_interval();
        let dispatch_handle = thread::Builder::new()
            .name(DISPATCH_THREAD.to_string())
            .spawn(move || {
                dispatcher.run(&rx, &stop, poll);
                state.abandon_handshake();
            })
            .map_err(SessionError::Spawn)?;
        self.lock_workers().push(dispatch_handle);
        Ok(())
    }

    /// Signal the workers, close the transport and join the workers.
    ///
    /// Called from a worker (a subscriber closing the session) the threads are
    /// left to exit on their own.
    fn stop_workers(&self) {
        self.stop.store(true, Ordering::Release);
        self.transport.close();
        self.state.abandon_handshake();

        let handles = std::mem::take(&mut *self.lock_workers());
        let current = thread::current().id();
        if handles.iter().any(|h| h.thread().id() == current) {
            debug!("session stopped from a worker thread; not joining");
            return;
        }
        for handle in handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!(thread = %name, "worker thread panicked");
            }
        }
    }

    /// Send a request to the radio. No retry on failure.
    pub fn send(&self, request: &Request) -> Result<()> {
        let status = self.status();
        if status != SessionStatus::Connected {
            return Err(SessionError::NotConnected(status));
        }
        self.write_request(request)
    }

    /// Replace the radio configuration.
    pub fn set_device_config(&self, config: RadioConfig) -> Result<()> {
        self.send(&Request::SetDeviceConfig(config))
    }

    fn write_request(&self, request: &Request) -> Result<()> {
        let payload = self.codec.encode_request(request)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.send(&payload)?;
        Ok(())
    }

    /// Stop the workers and release the transport. Idempotent.
    pub fn close(&self) {
        {
            let mut status = self.lock_status();
            if *status == SessionStatus::Closed {
                return;
            }
            *status = SessionStatus::Closed;
        }
        self.stop_workers();
        info!(transport = self.transport.name(), "session closed");
    }

    /// Wait until the radio finishes streaming its config.
    ///
    /// Returns the echoed nonce.
    pub fn wait_for_handshake(&self, timeout: Duration) -> Result<u32> {
        if self.state.handshake() == HandshakeStatus::Idle {
            return Err(SessionError::NotConnected(self.status()));
        }
        match self.state.wait_for_handshake(timeout) {
            HandshakeWait::Complete(config_id) => Ok(config_id),
            HandshakeWait::TimedOut => Err(SessionError::HandshakeTimeout(timeout)),
            HandshakeWait::Abandoned => match self.status() {
                SessionStatus::Closed => Err(SessionError::Closed),
                status => Err(SessionError::NotConnected(status)),
            },
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> SessionStatus {
        *self.lock_status()
    }

    /// Whether the reader and dispatcher threads are both still running.
    ///
    /// Goes false when the link fails underneath a connected session.
    pub fn is_receiving(&self) -> bool {
        let workers = self.lock_workers();
        !workers.is_empty() && workers.iter().all(|handle| !handle.is_finished())
    }

    /// Identity last reported by the radio.
    pub fn identity(&self) -> Option<MyNodeInfo> {
        self.state.identity()
    }

    /// Radio configuration last reported by the radio.
    pub fn device_config(&self) -> Option<RadioConfig> {
        self.state.device_config()
    }

    /// Progress of the config handshake for the current connection.
    pub fn handshake(&self) -> HandshakeStatus {
        self.state.handshake()
    }

    /// Register a callback for `topic`. Callbacks run on the dispatcher thread.
    pub fn subscribe<F>(&self, topic: Topic, subscriber: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.topics.subscribe(topic, subscriber);
    }

    /// Register a callback by topic name; unknown names are logged and ignored.
    pub fn subscribe_named<F>(&self, name: &str, subscriber: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.topics.subscribe_named(name, subscriber);
    }

    /// Subscribers registered on this session.
    pub fn topics(&self) -> &TopicRegistry {
        &self.topics
    }

    /// Settings the session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Name of the underlying transport, for logs.
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, SessionStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport.name())
            .field("status", &self.status())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn read_loop(mut reader: FrameReader<Arc<dyn Transport>>, tx: &FrameSender, stop: &AtomicBool) {
    debug!("reader started");
    while !stop.load(Ordering::Acquire) {
        match reader.poll_frame() {
            Ok(Some(frame)) => {
                debug!(payload_len = frame.len(), "frame received");
                if tx.push(frame).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => {
                if !stop.load(Ordering::Acquire) {
                    error!("serial read failed: {err}");
                }
                break;
            }
        }
    }
    let stats = reader.stats();
    debug!(frames = stats.frames, discarded = stats.discarded, "reader stopped");
}
