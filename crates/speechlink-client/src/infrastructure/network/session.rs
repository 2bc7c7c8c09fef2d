//! The relay session engine.
//!
//! A [`Session`] owns one transport, the send queue, the connection-state
//! cell, and the sender/receiver tasks for one connection attempt.  The
//! supervisor creates a fresh session per attempt and destroys it after
//! `disconnect`; nothing here is reused across reconnects.
//!
//! # Task model
//!
//! - **Sender task** – waits on the send-queue condition, pops one frame at
//!   a time, and writes it to the transport.  A write failure transitions
//!   the state to `Disconnected` and exits; the failure surfaces through the
//!   connection-state observer.
//! - **Receiver task** – reads the transport into a 4 KiB buffer in 100 ms
//!   slices (so it can notice shutdown), splits the bytes into frames with
//!   the line codec, and hands each frame to the registered
//!   [`InboundHandler`].  End-of-stream and read errors transition to
//!   `Disconnected` and fire the disconnect callback.
//!
//! Frames enqueued by one producer are sent in enqueue order; the queue
//! mutex serialises producers, and the single sender preserves FIFO on the
//! wire.
//!
//! # Handshake
//!
//! After `start`, [`Session::perform_handshake`] sends `protocol_version`,
//! pauses briefly for the transport to settle, sends `join`, and then polls
//! for the router to observe `channel_joined` (every 30 ms, at most 100
//! polls).  The router answers `channel_joined` with `set_braille_info` and
//! marks the handshake complete through its [`SessionHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use speechlink_core::protocol::codec::LineCodec;
use speechlink_core::protocol::messages::{ClientMessage, FrameError};
use speechlink_core::ConnectionParams;

use super::send_queue::SendQueue;
use super::state::{ConnectionStatus, StatusCell};
use super::transport::{TlsTransport, Transport, TransportError};

/// Interval between handshake-completion polls.
pub const HANDSHAKE_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Maximum handshake polls before giving up (≈ 3 s total).
pub const HANDSHAKE_MAX_POLLS: u32 = 100;

/// Receiver read buffer size.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// Upper bound on one receiver read await, so the task can observe a
/// disconnect even when the peer goes silent.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors raised by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation requires a connected session.
    #[error("session is not connected")]
    NotConnected,

    /// `connect` was called on a session that already left `Disconnected`.
    #[error("session has already started connecting")]
    AlreadyActive,

    /// Transport setup or I/O failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server never confirmed the channel join.
    #[error("server did not confirm channel join within the handshake timeout")]
    HandshakeTimeout,

    /// An outbound frame could not be encoded.
    #[error("failed to encode outbound frame: {0}")]
    Encode(#[from] FrameError),
}

/// Consumer of inbound frames, driven by the receiver task.
pub trait InboundHandler: Send + Sync + 'static {
    fn handle_frame(&self, frame: &str);
}

/// State shared between the session, its tasks, and outstanding handles.
struct SessionShared {
    status: StatusCell,
    queue: SendQueue,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    handshake_complete: AtomicBool,
    disconnect_started: AtomicBool,
    disconnect_fired: AtomicBool,
    disconnect_callback: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl SessionShared {
    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.lock().expect("transport lock poisoned").clone()
    }

    /// Records an involuntary connection loss observed by a task.
    fn mark_lost(&self) {
        self.status.set(ConnectionStatus::Disconnected);
        self.queue.close();
    }

    /// Runs the disconnect callback if it has not run for this session yet.
    fn fire_disconnect_callback(&self) {
        if self.disconnect_fired.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(guard) = self.disconnect_callback.lock() {
            if let Some(callback) = guard.as_ref() {
                debug!("running disconnect callback");
                callback();
            }
        }
    }

    /// Serialises and enqueues a message.  Returns whether the frame was
    /// accepted.
    fn enqueue_message(&self, message: &ClientMessage) -> bool {
        if !self.status.is_connected() {
            debug!("dropping outbound frame: session is not connected");
            return false;
        }
        match message.to_json() {
            Ok(json) => self.queue.enqueue(LineCodec::encode(&json)),
            Err(e) => {
                warn!(error = %e, "failed to encode outbound message");
                false
            }
        }
    }
}

/// A weak reference to a session's enqueue path.
///
/// Handles are held by the message router and the forwarding controller,
/// which both outlive any individual session inside a supervisor iteration.
/// Enqueueing through a handle whose session has been destroyed is a logged
/// no-op, never an error.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Weak<SessionShared>,
}

impl SessionHandle {
    /// Enqueues a message for sending.  Returns `false` when the session is
    /// gone or not connected.
    pub fn enqueue(&self, message: &ClientMessage) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.enqueue_message(message),
            None => {
                debug!("dropping outbound frame: session no longer exists");
                false
            }
        }
    }

    /// Marks the handshake complete.  Called by the router when
    /// `channel_joined` arrives.
    pub fn complete_handshake(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handshake_complete.store(true, Ordering::SeqCst);
        }
    }

    /// True while the session is connected and the handshake has completed.
    pub fn is_ready(&self) -> bool {
        self.shared
            .upgrade()
            .map(|shared| {
                shared.status.is_connected() && shared.handshake_complete.load(Ordering::SeqCst)
            })
            .unwrap_or(false)
    }
}

/// One connection attempt: transport, queue, state, and the two I/O tasks.
pub struct Session {
    shared: Arc<SessionShared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SessionShared {
                status: StatusCell::new(),
                queue: SendQueue::new(),
                transport: Mutex::new(None),
                handshake_complete: AtomicBool::new(false),
                disconnect_started: AtomicBool::new(false),
                disconnect_fired: AtomicBool::new(false),
                disconnect_callback: Mutex::new(None),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// A weak handle to this session's enqueue path.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle { shared: Arc::downgrade(&self.shared) }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.get()
    }

    /// True once connected *and* the protocol handshake has completed.
    pub fn is_ready(&self) -> bool {
        self.shared.status.is_connected()
            && self.shared.handshake_complete.load(Ordering::SeqCst)
    }

    /// Registers the callback run exactly once when this session ends,
    /// whether by peer close, transport error, or explicit disconnect.
    pub fn set_disconnect_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self
            .shared
            .disconnect_callback
            .lock()
            .expect("disconnect callback lock poisoned") = Some(Box::new(callback));
    }

    /// Registers the connection-state observer (see [`StatusCell`]).
    pub fn set_status_observer<F>(&self, observer: F)
    where
        F: Fn(ConnectionStatus, ConnectionStatus) + Send + Sync + 'static,
    {
        self.shared.status.set_observer(observer);
    }

    /// Establishes the TCP + TLS transport described by `params`.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyActive`] if the session has left
    /// `Disconnected`; [`SessionError::Transport`] on connect failure, after
    /// which the session returns to `Disconnected`.
    pub async fn connect(&self, params: &ConnectionParams) -> Result<(), SessionError> {
        if !self
            .shared
            .status
            .transition(ConnectionStatus::Disconnected, ConnectionStatus::Connecting)
        {
            return Err(SessionError::AlreadyActive);
        }
        info!(host = %params.host, port = params.port, "connecting to relay");

        match TlsTransport::connect(&params.host, params.port).await {
            Ok(transport) => {
                self.adopt_transport(transport);
                Ok(())
            }
            Err(e) => {
                self.shared.status.set(ConnectionStatus::Disconnected);
                Err(e.into())
            }
        }
    }

    /// Adopts an already-established transport, for callers that build their
    /// own (and for exercising the engine against a scripted transport).
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyActive`] if the session has left
    /// `Disconnected`.
    pub fn connect_with(&self, transport: Arc<dyn Transport>) -> Result<(), SessionError> {
        if !self
            .shared
            .status
            .transition(ConnectionStatus::Disconnected, ConnectionStatus::Connecting)
        {
            return Err(SessionError::AlreadyActive);
        }
        self.adopt_transport(transport);
        Ok(())
    }

    fn adopt_transport(&self, transport: Arc<dyn Transport>) {
        *self.shared.transport.lock().expect("transport lock poisoned") = Some(transport);
        self.shared
            .status
            .transition(ConnectionStatus::Connecting, ConnectionStatus::Connected);
    }

    /// Spawns the sender and receiver tasks.  Must follow a successful
    /// connect.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] when called in any other state.
    pub fn start(&self, handler: Arc<dyn InboundHandler>) -> Result<(), SessionError> {
        if !self.shared.status.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let transport = self.shared.transport().ok_or(SessionError::NotConnected)?;

        let mut tasks = self.tasks.lock().expect("task list lock poisoned");
        tasks.push(tokio::spawn(sender_loop(Arc::clone(&self.shared), Arc::clone(&transport))));
        tasks.push(tokio::spawn(receiver_loop(Arc::clone(&self.shared), transport, handler)));
        Ok(())
    }

    /// Enqueues a message for the sender task.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] when the session is not connected; a
    /// full queue is not an error (the frame is dropped and logged).
    pub fn send(&self, message: &ClientMessage) -> Result<(), SessionError> {
        if !self.shared.status.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.shared.enqueue_message(message);
        Ok(())
    }

    /// Runs the client side of the join handshake.
    ///
    /// # Errors
    ///
    /// [`SessionError::HandshakeTimeout`] when the server never confirms the
    /// join; [`SessionError::NotConnected`] when the connection drops while
    /// waiting.
    pub async fn perform_handshake(&self, key: &str) -> Result<(), SessionError> {
        self.send(&ClientMessage::protocol_version())?;
        // Give the freshly established transport a beat before the join, as
        // the relay expects the version announcement to land first.
        tokio::time::sleep(HANDSHAKE_POLL_INTERVAL).await;
        self.send(&ClientMessage::join(key))?;

        for _ in 0..HANDSHAKE_MAX_POLLS {
            if self.shared.handshake_complete.load(Ordering::SeqCst) {
                info!("protocol handshake complete");
                return Ok(());
            }
            if !self.shared.status.is_connected() {
                return Err(SessionError::NotConnected);
            }
            tokio::time::sleep(HANDSHAKE_POLL_INTERVAL).await;
        }
        Err(SessionError::HandshakeTimeout)
    }

    /// Tears the session down: stops both tasks, closes the transport,
    /// discards queued frames, and fires the disconnect callback.
    ///
    /// Safe to call any number of times from any number of tasks; only the
    /// first call does the work and later calls return immediately.
    pub async fn disconnect(&self) {
        if self.shared.disconnect_started.swap(true, Ordering::SeqCst) {
            debug!("disconnect already in progress, skipping");
            return;
        }
        info!("starting disconnect sequence");

        self.shared.status.set(ConnectionStatus::Disconnecting);
        self.shared.queue.close();

        if let Some(transport) = self.shared.transport() {
            transport.shutdown().await;
        }

        let tasks = {
            let mut guard = self.tasks.lock().expect("task list lock poisoned");
            std::mem::take(&mut *guard)
        };
        for task in tasks {
            if let Err(e) = task.await {
                debug!(error = %e, "session task ended abnormally");
            }
        }

        let dropped = self.shared.queue.drain();
        if dropped > 0 {
            debug!(count = dropped, "cleared unsent frames from queue");
        }
        *self.shared.transport.lock().expect("transport lock poisoned") = None;

        self.shared.status.set(ConnectionStatus::Disconnected);
        self.shared.fire_disconnect_callback();
        info!("disconnect sequence completed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Last-resort cleanup for sessions dropped without disconnect():
        // close the queue so producers stop, and abort any live tasks.
        self.shared.queue.close();
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

async fn sender_loop(shared: Arc<SessionShared>, transport: Arc<dyn Transport>) {
    debug!("sender task started");
    loop {
        let Some(frame) = shared.queue.pop().await else {
            break;
        };
        if !shared.status.is_connected() {
            break;
        }
        if let Err(e) = transport.send(&frame).await {
            error!(error = %e, "transport write failed");
            shared.mark_lost();
            break;
        }
        trace!(bytes = frame.len(), "frame written");
    }
    debug!("sender task terminated");
}

async fn receiver_loop(
    shared: Arc<SessionShared>,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn InboundHandler>,
) {
    debug!("receiver task started");
    let mut codec = LineCodec::new();
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    while shared.status.is_connected() {
        let read = tokio::time::timeout(RECV_POLL_INTERVAL, transport.recv(&mut buf)).await;
        match read {
            // Poll slice elapsed with nothing to read; re-check the state.
            Err(_) => continue,
            Ok(Ok(0)) => {
                info!("connection closed by peer");
                shared.mark_lost();
                shared.fire_disconnect_callback();
                break;
            }
            Ok(Ok(n)) => {
                codec.push(&buf[..n]);
                for frame in codec.drain_frames() {
                    trace!(%frame, "frame received");
                    handler.handle_frame(&frame);
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "transport read failed");
                shared.mark_lost();
                shared.fire_disconnect_callback();
                break;
            }
        }
    }
    debug!("receiver task terminated");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
