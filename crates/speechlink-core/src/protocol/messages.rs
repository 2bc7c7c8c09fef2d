//! Typed relay protocol messages.
//!
//! Every frame is a JSON object with a `type` string field.  Outbound
//! messages ([`ClientMessage`]) are serialised with an internally tagged
//! enum, which yields exactly the wire shapes the relay expects:
//!
//! ```text
//! {"type":"protocol_version","version":2}
//! {"type":"join","channel":"<key>","connection_type":"master"}
//! {"type":"set_braille_info","name":"noBraille","numCells":0}
//! {"type":"key","vk_code":65,"extended":false,"pressed":true,"scan_code":30}
//! ```
//!
//! Inbound frames ([`ServerMessage`]) are parsed from a generic JSON value
//! rather than deserialized into structs: the relay forwards messages from
//! heterogeneous screen-reader peers, so unknown types and extra fields are
//! the norm and must never fail the session.  A malformed frame is reported
//! as a [`FrameError`] so the caller can log and drop it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Relay protocol version announced during the handshake.
pub const PROTOCOL_VERSION: u32 = 2;

/// Connection role announced in the `join` message.  A master connection
/// sends key events and consumes speech/tone/wave output.
pub const CONNECTION_TYPE_MASTER: &str = "master";

/// Braille display name announced after joining.  This client renders no
/// braille, so it registers a null display with zero cells.
pub const BRAILLE_DISPLAY_NAME: &str = "noBraille";

/// Cell count of the null braille display.
pub const BRAILLE_CELL_COUNT: u32 = 0;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors produced while encoding or parsing a single frame.
///
/// A `FrameError` on an inbound frame is never session-fatal; the router
/// logs it and drops the frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame body is not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame parsed, but the top-level value is not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The object has no string `type` field to dispatch on.
    #[error("frame has no string `type` field")]
    MissingType,

    /// A message of a known type is missing a required field.
    #[error("`{kind}` frame is missing usable `{field}` field")]
    MissingField { kind: String, field: &'static str },
}

// ── Outbound messages ─────────────────────────────────────────────────────────

/// A keyboard press or release forwarded to the remote peer.
///
/// The virtual-key code is the OS-level logical key identifier and is passed
/// through opaquely; the scan code and extended flag ride along so the remote
/// side can synthesise a faithful event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub vk_code: u32,
    pub extended: bool,
    pub pressed: bool,
    pub scan_code: u16,
}

impl KeyEvent {
    /// A key-down event.
    pub fn press(vk_code: u32, scan_code: u16, extended: bool) -> Self {
        Self { vk_code, extended, pressed: true, scan_code }
    }

    /// A key-up event.
    pub fn release(vk_code: u32, scan_code: u16, extended: bool) -> Self {
        Self { vk_code, extended, pressed: false, scan_code }
    }
}

/// All messages this client produces, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ProtocolVersion {
        version: u32,
    },
    Join {
        channel: String,
        connection_type: String,
    },
    SetBrailleInfo {
        name: String,
        #[serde(rename = "numCells")]
        num_cells: u32,
    },
    Key(KeyEvent),
}

impl ClientMessage {
    /// The `protocol_version` announcement, first message of the handshake.
    pub fn protocol_version() -> Self {
        ClientMessage::ProtocolVersion { version: PROTOCOL_VERSION }
    }

    /// The `join` request binding this session to a channel as a master
    /// connection.
    pub fn join(channel: &str) -> Self {
        ClientMessage::Join {
            channel: channel.to_string(),
            connection_type: CONNECTION_TYPE_MASTER.to_string(),
        }
    }

    /// The null braille display announcement sent once `channel_joined`
    /// arrives.
    pub fn braille_info() -> Self {
        ClientMessage::SetBrailleInfo {
            name: BRAILLE_DISPLAY_NAME.to_string(),
            num_cells: BRAILLE_CELL_COUNT,
        }
    }

    /// Serialises the message to its single-line JSON form (no trailing
    /// newline; the codec adds that).
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Json`] if serialisation fails, which cannot
    /// happen for the message shapes defined here but is propagated rather
    /// than swallowed.
    pub fn to_json(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Inbound messages ──────────────────────────────────────────────────────────

/// Messages the relay delivers to this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// The server confirmed the `join`; the handshake can complete.
    ChannelJoined,
    /// The remote peer cancelled in-progress speech.
    Cancel,
    /// Speech output.  `text` is `None` when the `sequence` field was missing
    /// or not an array; it may be an empty string when the sequence contained
    /// no usable text.  Both cases are no-ops for the caller.
    Speak { text: Option<String> },
    /// A tone request with frequency in hertz and duration in milliseconds.
    Tone { hz: u32, duration_ms: u32 },
    /// A wave-file playback request.  The name may be empty, which callers
    /// treat as a no-op.
    Wave { file_name: String },
    /// Echo of a key event on the channel; master connections ignore these.
    KeyEcho,
    /// Any message type this client does not understand.
    Unknown { kind: String },
}

/// Parses one inbound frame into a [`ServerMessage`].
///
/// Parsing is deliberately tolerant: extra fields are ignored everywhere, and
/// the `speak` sequence skips non-string and empty-string elements.  Only
/// structurally broken frames (non-JSON, non-object, missing `type`, or a
/// `tone` without usable integers) produce an error.
///
/// # Errors
///
/// Returns [`FrameError`] when the frame cannot be interpreted at all.
pub fn parse_server_message(raw: &str) -> Result<ServerMessage, FrameError> {
    let value: Value = serde_json::from_str(raw)?;
    let object = value.as_object().ok_or(FrameError::NotAnObject)?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(FrameError::MissingType)?;

    let message = match kind {
        "channel_joined" => ServerMessage::ChannelJoined,
        "cancel" => ServerMessage::Cancel,
        "speak" => ServerMessage::Speak {
            text: object
                .get("sequence")
                .and_then(Value::as_array)
                .map(|sequence| concat_speech_sequence(sequence)),
        },
        "tone" => ServerMessage::Tone {
            hz: require_u32(object, "tone", "hz")?,
            duration_ms: require_u32(object, "tone", "length")?,
        },
        "wave" => ServerMessage::Wave {
            file_name: object
                .get("fileName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        "key" => ServerMessage::KeyEcho,
        other => ServerMessage::Unknown { kind: other.to_string() },
    };
    Ok(message)
}

/// Joins the string elements of a `speak` sequence with single-space
/// separators, skipping non-string and empty elements, and trims the one
/// trailing separator.
fn concat_speech_sequence(sequence: &[Value]) -> String {
    let mut text = String::new();
    for item in sequence {
        if let Some(part) = item.as_str() {
            if !part.is_empty() {
                text.push_str(part);
                text.push(' ');
            }
        }
    }
    text.pop();
    text
}

fn require_u32(
    object: &serde_json::Map<String, Value>,
    kind: &str,
    field: &'static str,
) -> Result<u32, FrameError> {
    object
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| FrameError::MissingField { kind: kind.to_string(), field })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
