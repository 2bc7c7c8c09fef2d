//! Network infrastructure: the TLS transport, the framed session engine and
//! its sender/receiver tasks, the bounded send queue, and the atomic
//! connection-state cell.
//!
//! Ownership is strictly per-session: each [`session::Session`] owns one
//! transport and its two tasks, and everything is torn down on its
//! `disconnect`.  The supervisor creates a fresh session per connection
//! attempt.

pub mod send_queue;
pub mod session;
pub mod state;
pub mod transport;

pub use session::{InboundHandler, Session, SessionError, SessionHandle};
pub use state::{ConnectionStatus, StatusCell};
pub use transport::{Transport, TransportError};
