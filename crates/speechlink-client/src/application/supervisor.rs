//! Session lifecycle supervision.
//!
//! The supervisor owns the reconnect policy; each [`Session`] only reports
//! its own lifecycle.  One iteration of the loop is one session: connect,
//! handshake, run the platform input loop, tear down.  Connection loss
//! re-enters the loop after 2 s; failed attempts retry every 5 s; only the
//! operator's shutdown signal ends the loop.
//!
//! The single deliberate exception: when the connection parameters came
//! from the command line and the *first* attempt fails to connect or to
//! complete the handshake, the supervisor gives up so scripts get a prompt
//! exit status instead of a silent retry loop.  Interactive sessions always
//! retry.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use speechlink_core::{ConnectionParams, ShortcutSpec};

use crate::application::forwarding::ForwardingController;
use crate::application::router::MessageRouter;
use crate::infrastructure::audio::AudioBackend;
use crate::infrastructure::input_capture::{self, HookCallback, HookVerdict};
use crate::infrastructure::network::{ConnectionStatus, Session, SessionError};
use crate::infrastructure::signal::Latch;
use crate::infrastructure::speech::SpeechBackend;

/// Delay between failed connection attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Delay before reconnecting after an established session drops.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Errors that end the supervisor loop.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The first attempt of a command-line-parameterised run failed.
    #[error("initial connection failed: {0}")]
    InitialConnect(#[source] SessionError),
}

/// Drives sessions against one set of connection parameters until shutdown.
pub struct Supervisor {
    params: ConnectionParams,
    params_from_cli: bool,
    speech: Arc<dyn SpeechBackend>,
    audio: Arc<dyn AudioBackend>,
    shutdown: Arc<Latch>,
}

impl Supervisor {
    pub fn new(
        params: ConnectionParams,
        params_from_cli: bool,
        speech: Arc<dyn SpeechBackend>,
        audio: Arc<dyn AudioBackend>,
        shutdown: Arc<Latch>,
    ) -> Self {
        Self { params, params_from_cli, speech, audio, shutdown }
    }

    /// Runs the session loop until shutdown (or a fatal first attempt).
    ///
    /// # Errors
    ///
    /// [`SupervisorError::InitialConnect`] under the command-line first
    /// attempt rule described in the module docs.
    pub async fn run(&self) -> Result<(), SupervisorError> {
        let shortcut = self
            .params
            .shortcut
            .as_deref()
            .map(ShortcutSpec::parse)
            .unwrap_or_default();
        info!(%shortcut, "forwarding toggle shortcut");

        let mut first_attempt = true;
        while !self.shutdown.is_set() {
            let session = Session::new();
            let session_down = Arc::new(Latch::new());
            {
                let latch = Arc::clone(&session_down);
                session.set_disconnect_callback(move || latch.set());
            }
            {
                // Sender-side write failures have no disconnect callback of
                // their own; they surface through the state observer.
                let latch = Arc::clone(&session_down);
                session.set_status_observer(move |old, new| {
                    tracing::debug!(?old, ?new, "connection state changed");
                    if new == ConnectionStatus::Disconnected {
                        latch.set();
                    }
                });
            }

            if let Err(e) = session.connect(&self.params).await {
                if first_attempt && self.params_from_cli {
                    return Err(SupervisorError::InitialConnect(e));
                }
                warn!(error = %e, "connection failed; retrying in 5 seconds");
                if !self.sleep_unless_shutdown(CONNECT_RETRY_DELAY).await {
                    break;
                }
                continue;
            }

            let router = Arc::new(MessageRouter::new(
                session.handle(),
                Arc::clone(&self.speech),
                Arc::clone(&self.audio),
            ));
            if let Err(e) = session.start(router) {
                warn!(error = %e, "could not start session tasks");
                session.disconnect().await;
                continue;
            }

            if let Err(e) = session.perform_handshake(&self.params.key).await {
                warn!(error = %e, "handshake failed");
                session.disconnect().await;
                if first_attempt && self.params_from_cli {
                    return Err(SupervisorError::InitialConnect(e));
                }
                if !self.sleep_unless_shutdown(CONNECT_RETRY_DELAY).await {
                    break;
                }
                continue;
            }
            first_attempt = false;
            info!("session ready");

            // The controller is rebuilt per session so its enqueue handle
            // dies with the session.
            let controller = Arc::new(Mutex::new(ForwardingController::new(
                shortcut,
                Box::new(session.handle()),
                Arc::clone(&self.audio),
            )));
            self.run_input_loop(Arc::clone(&controller), Arc::clone(&session_down)).await;

            // Drain held keys before tearing the session down so the
            // release frames still have a queue to land in.
            if let Ok(mut controller) = controller.lock() {
                controller.release_held();
            }
            session.disconnect().await;

            if self.shutdown.is_set() {
                break;
            }
            info!("connection lost; reconnecting in 2 seconds");
            if !self.sleep_unless_shutdown(RECONNECT_DELAY).await {
                break;
            }
        }
        Ok(())
    }

    /// Runs the platform input loop for one session, falling back to a
    /// plain wait when the hook cannot be installed.
    async fn run_input_loop(
        &self,
        controller: Arc<Mutex<ForwardingController>>,
        session_down: Arc<Latch>,
    ) {
        let callback: HookCallback = {
            let controller = Arc::clone(&controller);
            Box::new(move |event| match controller.lock() {
                Ok(mut controller) => controller.handle_event(event),
                Err(_) => HookVerdict::PassThrough,
            })
        };
        let stop = {
            let shutdown = Arc::clone(&self.shutdown);
            let session_down = Arc::clone(&session_down);
            move || shutdown.is_set() || session_down.is_set()
        };

        if let Err(e) = input_capture::run_input_loop(callback, stop).await {
            warn!(error = %e, "keyboard capture unavailable; continuing in receive-only mode");
            tokio::select! {
                _ = session_down.wait() => {}
                _ = self.shutdown.wait() => {}
            }
        }
    }

    /// Sleeps for `delay` unless shutdown fires first; returns whether the
    /// full delay elapsed.
    async fn sleep_unless_shutdown(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.shutdown.wait() => false,
        }
    }
}
