//! Speech backend seam.
//!
//! The session engine does not care how text becomes audible; it talks to a
//! [`SpeechBackend`] trait object.  Native screen-reader bridges plug in
//! behind this trait; the crate ships a console renderer for receive-only
//! terminals and a null backend for `--no-speech`.
//!
//! Router policy: inbound `speak` messages are always queued
//! (`interrupt = false`) so rapid successive announcements are not cut off;
//! the remote side interrupts explicitly with `cancel`.

use std::io::Write;

use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by speech-backend initialisation.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech backend unavailable: {0}")]
    Unavailable(String),
}

/// An opaque speech synthesiser.
///
/// Implementations must be safe to call from the receiver task and must not
/// block it for the duration of the utterance.
pub trait SpeechBackend: Send + Sync {
    /// Prepares the backend.  Failure is not fatal to the client; callers
    /// downgrade to [`NullSpeech`].
    fn initialize(&self) -> Result<(), SpeechError>;

    /// Speaks `text`.  With `interrupt` false the utterance queues behind
    /// any in-progress speech.
    fn speak(&self, text: &str, interrupt: bool);

    /// Stops in-progress and queued speech.
    fn stop(&self);

    /// Releases backend resources.  Called once at client shutdown.
    fn cleanup(&self);
}

/// Backend that discards everything.  Used for `--no-speech` and as the
/// fallback when a real backend fails to initialise.
pub struct NullSpeech;

impl SpeechBackend for NullSpeech {
    fn initialize(&self) -> Result<(), SpeechError> {
        Ok(())
    }

    fn speak(&self, text: &str, _interrupt: bool) {
        debug!(%text, "speech disabled, dropping utterance");
    }

    fn stop(&self) {}

    fn cleanup(&self) {}
}

/// Backend that renders announcements to the terminal.
///
/// The default where no native synthesiser is wired up, which keeps
/// receive-only sessions useful: the operator still sees everything the
/// remote screen reader said.
pub struct ConsoleSpeech;

impl SpeechBackend for ConsoleSpeech {
    fn initialize(&self) -> Result<(), SpeechError> {
        info!("console speech renderer initialised");
        Ok(())
    }

    fn speak(&self, text: &str, _interrupt: bool) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{text}");
        let _ = stdout.flush();
    }

    fn stop(&self) {
        // Printed text cannot be recalled; nothing queues here either.
    }

    fn cleanup(&self) {}
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_speech_initialises_and_ignores_everything() {
        let speech = NullSpeech;
        assert!(speech.initialize().is_ok());
        speech.speak("ignored", false);
        speech.stop();
        speech.cleanup();
    }

    #[test]
    fn test_console_speech_initialises() {
        assert!(ConsoleSpeech.initialize().is_ok());
    }
}
