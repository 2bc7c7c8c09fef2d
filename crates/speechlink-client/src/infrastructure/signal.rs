//! Process-wide shutdown signalling.
//!
//! A [`Latch`] is a one-way boolean: once set it stays set, and every waiter
//! past or future observes it.  The supervisor uses one latch for operator
//! shutdown (Ctrl-C, console close) and a fresh one per session for the
//! disconnect signal, so every suspension point can select on "work" versus
//! "stop" without polling faster than it needs to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::info;

/// A set-once flag with async wakeup.
#[derive(Debug, Default)]
pub struct Latch {
    set: AtomicBool,
    notify: Notify,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latch and wakes every waiter.  Subsequent calls are no-ops.
    pub fn set(&self) {
        if !self.set.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::SeqCst)
    }

    /// Completes once the latch is set.  Returns immediately if it already
    /// is.
    pub async fn wait(&self) {
        loop {
            if self.is_set() {
                return;
            }
            let notified = self.notify.notified();
            // Re-check after registering so a set() racing with registration
            // cannot be missed.
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

/// Installs the Ctrl-C handler that trips the shutdown latch.
pub fn install_signal_handlers(shutdown: Arc<Latch>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.set();
        }
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────
