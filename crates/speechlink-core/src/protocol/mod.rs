//! Wire protocol for the relay session.
//!
//! The relay speaks newline-delimited JSON over TLS.  `messages` defines the
//! typed message set (outbound and inbound), `codec` turns a raw byte stream
//! into individual frames and back.

pub mod codec;
pub mod messages;
