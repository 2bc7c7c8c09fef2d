//! Tone and wave playback.
//!
//! Audio output runs on its own thread because the rodio output stream is
//! not `Send` and callers (the receiver task, the hook callback) must never
//! block on the sound device.  Commands cross over a channel; if the device
//! is unavailable the thread exits and every later command becomes a logged
//! no-op, which is the required degradation: the client keeps forwarding
//! keys even with no sound.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{Decoder, OutputStream, Sink};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by audio playback.  Currently only surfaced in logs; audio
/// failures never propagate to the session.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
}

/// An opaque audio renderer for tones and wave files.
pub trait AudioBackend: Send + Sync {
    /// Plays a sine tone of `hz` for `duration_ms`, without blocking.
    fn play_tone(&self, hz: u32, duration_ms: u32);

    /// Resolves `file_name` against the wave search path and plays it,
    /// without blocking.  Unresolvable names are logged and dropped.
    fn play_wave(&self, file_name: &str);
}

enum AudioCommand {
    Tone { hz: u32, duration_ms: u32 },
    Wave { path: PathBuf },
}

/// Production audio backend on a dedicated playback thread.
pub struct RodioAudio {
    commands: mpsc::Sender<AudioCommand>,
}

impl RodioAudio {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        if let Err(e) = std::thread::Builder::new()
            .name("speechlink-audio".to_string())
            .spawn(move || playback_loop(rx))
        {
            warn!(error = %e, "could not start audio thread; sound is disabled");
        }
        Self { commands: tx }
    }
}

impl Default for RodioAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for RodioAudio {
    fn play_tone(&self, hz: u32, duration_ms: u32) {
        if self.commands.send(AudioCommand::Tone { hz, duration_ms }).is_err() {
            debug!(hz, duration_ms, "audio backend unavailable, dropping tone");
        }
    }

    fn play_wave(&self, file_name: &str) {
        let Some(path) = resolve_wave_path(file_name) else {
            warn!(file_name, "sound file not found");
            return;
        };
        debug!(path = %path.display(), "playing sound");
        if self.commands.send(AudioCommand::Wave { path }).is_err() {
            debug!(file_name, "audio backend unavailable, dropping wave");
        }
    }
}

fn playback_loop(rx: mpsc::Receiver<AudioCommand>) {
    let (stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            warn!(error = %e, "audio output unavailable; sound cues disabled");
            return; // Dropping rx makes every send a logged no-op.
        }
    };

    while let Ok(command) = rx.recv() {
        let sink = match Sink::try_new(&handle) {
            Ok(sink) => sink,
            Err(e) => {
                debug!(error = %e, "failed to open audio sink");
                continue;
            }
        };
        match command {
            AudioCommand::Tone { hz, duration_ms } => {
                let source = SineWave::new(hz as f32)
                    .take_duration(Duration::from_millis(u64::from(duration_ms)))
                    .amplify(0.25);
                sink.append(source);
                sink.detach();
            }
            AudioCommand::Wave { path } => match File::open(&path) {
                Ok(file) => match Decoder::new(BufReader::new(file)) {
                    Ok(source) => {
                        sink.append(source);
                        sink.detach();
                    }
                    Err(e) => debug!(path = %path.display(), error = %e, "undecodable sound file"),
                },
                Err(e) => debug!(path = %path.display(), error = %e, "could not open sound file"),
            },
        }
    }
    drop(stream);
}

/// Searches the known sound directories for `file_name`, appending a `.wav`
/// extension when none is given.  Returns the first existing path.
pub fn resolve_wave_path(file_name: &str) -> Option<PathBuf> {
    if file_name.is_empty() {
        return None;
    }

    let mut roots: Vec<PathBuf> = vec![
        PathBuf::from("sounds"),
        PathBuf::from("../../sounds"),
        // Add-on layouts from earlier deployments of the relay.
        PathBuf::from("../NVDARemote/addon/sounds"),
        PathBuf::from("../../NVDARemote/addon/sounds"),
    ];
    #[cfg(windows)]
    {
        for var in ["ProgramFiles", "ProgramFiles(x86)"] {
            if let Ok(base) = std::env::var(var) {
                roots.push(PathBuf::from(base).join("NVDA").join("waves"));
            }
        }
    }

    for root in roots {
        let mut candidate = root.join(file_name);
        if candidate.extension().is_none() {
            candidate.set_extension("wav");
        }
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_wave_path_rejects_empty_name() {
        assert_eq!(resolve_wave_path(""), None);
    }

    #[test]
    fn test_resolve_wave_path_returns_none_for_missing_file() {
        assert_eq!(resolve_wave_path("definitely-not-a-real-sound"), None);
    }

    #[test]
    fn test_resolve_wave_path_finds_file_and_defaults_extension() {
        // Run from a scratch directory with its own sounds/ so the search
        // relative paths resolve against it.
        let scratch =
            std::env::temp_dir().join(format!("speechlink-audio-test-{}", std::process::id()));
        let sounds = scratch.join("sounds");
        std::fs::create_dir_all(&sounds).unwrap();
        std::fs::write(sounds.join("ding.wav"), b"RIFF").unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(&scratch).unwrap();
        let with_extension = resolve_wave_path("ding.wav");
        let without_extension = resolve_wave_path("ding");
        std::env::set_current_dir(previous).unwrap();
        let _ = std::fs::remove_dir_all(&scratch);

        assert_eq!(with_extension, Some(PathBuf::from("sounds").join("ding.wav")));
        assert_eq!(without_extension, Some(PathBuf::from("sounds").join("ding.wav")));
    }

    #[test]
    fn test_play_tone_never_blocks_or_panics_without_device() {
        // Whether or not the machine has an output device, the call must
        // return immediately.
        let audio = RodioAudio::new();
        audio.play_tone(880, 100);
        audio.play_wave("missing");
    }
}
