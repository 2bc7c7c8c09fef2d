//! # speechlink-core
//!
//! Shared library for the speechlink remote screen-reader relay client,
//! containing the wire protocol types, the line-delimited JSON codec, the
//! keyboard domain model, and connection-parameter validation.
//!
//! This crate has zero dependencies on OS APIs, network sockets, or an async
//! runtime, which keeps every piece of protocol and keyboard logic unit
//! testable on any platform.
//!
//! # Architecture overview
//!
//! speechlink connects a local machine to a relay server and joins a shared
//! channel identified by a secret key.  The remote peer on the same channel
//! receives our keyboard input and sends back speech, tone, and wave-file
//! messages produced by its screen reader.  This crate defines:
//!
//! - **`protocol`** – How bytes travel over the wire.  Each message is one
//!   UTF-8 JSON object terminated by a newline.  Outbound messages are typed
//!   structs serialised with `serde`; inbound frames are parsed tolerantly so
//!   that unknown message types and junk fields never take the session down.
//!
//! - **`keyboard`** – Pure keyboard state: modifier flags, the set of keys
//!   whose presses have been forwarded but not yet released, and the parser
//!   for the configurable toggle-shortcut specification.
//!
//! - **`config`** – Connection parameters (host, port, key) and the
//!   validation rules the CLI and the interactive prompt share.

pub mod config;
pub mod keyboard;
pub mod protocol;

pub use config::{ConfigError, ConnectionParams, DEFAULT_PORT};
pub use keyboard::shortcut::ShortcutSpec;
pub use keyboard::state::{KeyboardState, ModifierState, PressedKey};
pub use protocol::codec::LineCodec;
pub use protocol::messages::{parse_server_message, ClientMessage, FrameError, KeyEvent, ServerMessage};
