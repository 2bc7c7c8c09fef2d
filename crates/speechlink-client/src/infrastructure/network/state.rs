//! Atomic connection lifecycle state.
//!
//! The session state is read from hook callbacks, the sender and receiver
//! tasks, and the supervisor, so it lives in a lock-free atomic.  The only
//! legal forward order is Disconnected → Connecting → Connected →
//! Disconnecting → Disconnected, with Connecting → Disconnected on a failed
//! connect.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

/// Lifecycle state of one relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionStatus {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Disconnecting = 3,
}

impl ConnectionStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionStatus::Connecting,
            2 => ConnectionStatus::Connected,
            3 => ConnectionStatus::Disconnecting,
            _ => ConnectionStatus::Disconnected,
        }
    }
}

type StatusObserver = Box<dyn Fn(ConnectionStatus, ConnectionStatus) + Send + Sync>;

/// An atomic [`ConnectionStatus`] with a change observer.
///
/// The observer runs synchronously on the transitioning thread, after the
/// store, exactly once per successful change.  Reads are plain atomic loads;
/// the observer slot is behind a mutex because it is written once at wiring
/// time and read only on transitions.
pub struct StatusCell {
    status: AtomicU8,
    observer: Mutex<Option<StatusObserver>>,
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    /// A cell starting in `Disconnected`.
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(ConnectionStatus::Disconnected as u8),
            observer: Mutex::new(None),
        }
    }

    /// Registers the observer invoked with `(old, new)` after each change.
    pub fn set_observer<F>(&self, observer: F)
    where
        F: Fn(ConnectionStatus, ConnectionStatus) + Send + Sync + 'static,
    {
        *self.observer.lock().expect("observer lock poisoned") = Some(Box::new(observer));
    }

    pub fn get(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionStatus::Connected
    }

    /// Unconditionally moves to `to`, returning the previous state.  Fires
    /// the observer when the state actually changed.
    pub fn set(&self, to: ConnectionStatus) -> ConnectionStatus {
        let old = ConnectionStatus::from_u8(self.status.swap(to as u8, Ordering::SeqCst));
        if old != to {
            self.notify(old, to);
        }
        old
    }

    /// Compare-exchange transition: moves to `to` only when currently at
    /// `from`.  Returns whether the transition happened; the observer fires
    /// only on success.
    pub fn transition(&self, from: ConnectionStatus, to: ConnectionStatus) -> bool {
        let swapped = self
            .status
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if swapped {
            self.notify(from, to);
        }
        swapped
    }

    fn notify(&self, old: ConnectionStatus, new: ConnectionStatus) {
        if let Ok(guard) = self.observer.lock() {
            if let Some(observer) = guard.as_ref() {
                observer(old, new);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
