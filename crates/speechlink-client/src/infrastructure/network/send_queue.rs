//! Bounded FIFO of outbound frames.
//!
//! Producers are many (the forwarding controller inside the hook callback,
//! the message router, the handshake) and the consumer is the single sender
//! task.  `enqueue` is synchronous and non-blocking so it can be called from
//! the hook callback; `pop` is the async rendering of a condition-variable
//! wait, safe against spurious wakeups because it re-checks under the lock
//! on every iteration.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::warn;

/// Maximum frames held while the sender is busy.  Overflow rejects the new
/// frame and logs; key frames are small, so hitting this means the link has
/// been dead for a while.
pub const MAX_PENDING_FRAMES: usize = 1024;

#[derive(Debug)]
struct QueueInner {
    frames: VecDeque<Vec<u8>>,
    open: bool,
}

/// Mutex-guarded frame FIFO with an async wake condition.
#[derive(Debug)]
pub struct SendQueue {
    inner: Mutex<QueueInner>,
    wake: Notify,
}

impl Default for SendQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SendQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner { frames: VecDeque::new(), open: true }),
            wake: Notify::new(),
        }
    }

    /// Appends a frame and wakes the sender.  Returns `false` (with a log)
    /// when the queue is closed or full; the frame is dropped in both cases.
    pub fn enqueue(&self, frame: Vec<u8>) -> bool {
        {
            let mut inner = self.inner.lock().expect("send queue lock poisoned");
            if !inner.open {
                warn!("dropping outbound frame: send queue is closed");
                return false;
            }
            if inner.frames.len() >= MAX_PENDING_FRAMES {
                warn!(capacity = MAX_PENDING_FRAMES, "dropping outbound frame: send queue full");
                return false;
            }
            inner.frames.push_back(frame);
        }
        self.wake.notify_one();
        true
    }

    /// Waits until a frame is available or the queue closes.  Returns `None`
    /// once closed and empty of the frame being waited for; remaining frames
    /// after close are left for [`drain`](Self::drain) to count and discard.
    pub async fn pop(&self) -> Option<Vec<u8>> {
        loop {
            let notified = self.wake.notified();
            {
                let mut inner = self.inner.lock().expect("send queue lock poisoned");
                if !inner.open {
                    return None;
                }
                if let Some(frame) = inner.frames.pop_front() {
                    return Some(frame);
                }
            }
            notified.await;
        }
    }

    /// Closes the queue and wakes every waiter.  Subsequent `enqueue` calls
    /// are rejected and `pop` returns `None`.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock().expect("send queue lock poisoned");
            inner.open = false;
        }
        self.wake.notify_waiters();
    }

    /// Discards all queued frames, returning how many were dropped.
    pub fn drain(&self) -> usize {
        let mut inner = self.inner.lock().expect("send queue lock poisoned");
        let dropped = inner.frames.len();
        inner.frames.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("send queue lock poisoned").frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
