//! Inbound message routing.
//!
//! The receiver task hands every complete frame to the router.  Malformed
//! frames are logged and dropped; recognised messages drive the speech and
//! audio collaborators; unknown types are ignored so protocol growth on the
//! relay never breaks old clients.

use std::sync::Arc;

use tracing::{debug, info, warn};

use speechlink_core::protocol::messages::{parse_server_message, ClientMessage, ServerMessage};

use crate::infrastructure::audio::AudioBackend;
use crate::infrastructure::network::{InboundHandler, SessionHandle};
use crate::infrastructure::speech::SpeechBackend;

/// Routes parsed inbound messages to their collaborators.
pub struct MessageRouter {
    session: SessionHandle,
    speech: Arc<dyn SpeechBackend>,
    audio: Arc<dyn AudioBackend>,
}

impl MessageRouter {
    pub fn new(
        session: SessionHandle,
        speech: Arc<dyn SpeechBackend>,
        audio: Arc<dyn AudioBackend>,
    ) -> Self {
        Self { session, speech, audio }
    }
}

impl InboundHandler for MessageRouter {
    fn handle_frame(&self, frame: &str) {
        let message = match parse_server_message(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "dropping malformed inbound frame");
                return;
            }
        };

        match message {
            ServerMessage::ChannelJoined => {
                info!("joined channel");
                // Announce the null braille display, then unblock the
                // handshake poll.
                self.session.enqueue(&ClientMessage::braille_info());
                self.session.complete_handshake();
            }
            ServerMessage::Cancel => {
                debug!("speech cancel requested");
                self.speech.stop();
            }
            ServerMessage::Speak { text: None } => {
                debug!("speak frame missing usable sequence");
            }
            ServerMessage::Speak { text: Some(text) } => {
                if text.is_empty() {
                    debug!("speak frame produced no text");
                } else {
                    debug!(%text, "speaking");
                    // Always queue; cancel messages handle interruption.
                    self.speech.speak(&text, false);
                }
            }
            ServerMessage::Tone { hz, duration_ms } => {
                self.audio.play_tone(hz, duration_ms);
            }
            ServerMessage::Wave { file_name } => {
                if file_name.is_empty() {
                    debug!("wave frame without file name");
                } else {
                    self.audio.play_wave(&file_name);
                }
            }
            ServerMessage::KeyEcho => {
                // Our own key events echoed around the channel; nothing to do.
            }
            ServerMessage::Unknown { kind } => {
                debug!(%kind, "ignoring unknown message type");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
