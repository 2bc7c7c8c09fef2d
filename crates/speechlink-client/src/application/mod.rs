//! Application layer: session-independent policy.
//!
//! - `router`     – dispatches parsed inbound messages to the speech and
//!   audio collaborators and completes the handshake.
//! - `forwarding` – the toggle state machine that turns raw hook events
//!   into outbound key frames, with the no-stuck-key drain.
//! - `supervisor` – the connect/handshake/reconnect lifecycle loop.

pub mod forwarding;
pub mod router;
pub mod supervisor;
