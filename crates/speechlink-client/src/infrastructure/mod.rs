//! Infrastructure services: everything that touches the OS or the network.
//!
//! - `network`  – TLS transport, framed session engine, send queue, and the
//!   atomic connection-state cell.
//! - `audio`    – tone and wave playback on a dedicated rodio thread.
//! - `speech`   – the speech-backend seam and its shipped implementations.
//! - `input_capture` – the platform keyboard hook abstraction.
//! - `signal`   – the process-wide shutdown latch and signal handler wiring.

pub mod audio;
pub mod input_capture;
pub mod network;
pub mod signal;
pub mod speech;
