//! Toggle-shortcut specification.
//!
//! The chord that switches keyboard forwarding on and off is configurable as
//! `mod[+mod...]+key`, e.g. `ctrl+win+f11` or `ctrl+shift+pause`.  Parsing is
//! case-insensitive and forgiving: unknown tokens are logged and skipped so a
//! typo degrades to a smaller chord instead of refusing to start.

use std::fmt;

use tracing::warn;

use super::vk::{key_name, parse_key_name, VK_F11};

/// The modifier set and trigger key of the toggle chord.
///
/// Matching is strict: the chord fires only when the live modifier flags
/// equal this specification exactly, so holding an extra modifier disarms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutSpec {
    pub ctrl: bool,
    pub win: bool,
    pub alt: bool,
    pub shift: bool,
    pub trigger_vk: u32,
}

impl Default for ShortcutSpec {
    /// `ctrl+win+f11`.
    fn default() -> Self {
        Self { ctrl: true, win: true, alt: false, shift: false, trigger_vk: VK_F11 }
    }
}

impl ShortcutSpec {
    /// Parses a shortcut specification.
    ///
    /// Recognised modifier tokens: `ctrl`/`control`, `win`/`windows`/`cmd`,
    /// `alt`, `shift`.  Any other token is looked up as a key name; tokens
    /// that resolve to nothing are logged at WARN and ignored.  If no key
    /// token is recognised, the trigger stays at the F11 default.  An empty
    /// specification yields the full default chord.
    pub fn parse(spec: &str) -> Self {
        if spec.trim().is_empty() {
            return Self::default();
        }

        let mut parsed = Self {
            ctrl: false,
            win: false,
            alt: false,
            shift: false,
            trigger_vk: VK_F11,
        };

        for token in spec.split('+') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => parsed.ctrl = true,
                "win" | "windows" | "cmd" => parsed.win = true,
                "alt" => parsed.alt = true,
                "shift" => parsed.shift = true,
                other => match parse_key_name(other) {
                    Some(vk) => parsed.trigger_vk = vk,
                    None => warn!(token = other, "unknown key in shortcut, ignoring"),
                },
            }
        }
        parsed
    }
}

impl fmt::Display for ShortcutSpec {
    /// Enabled modifiers in the fixed order ctrl, win, alt, shift, followed
    /// by the trigger key name.  Parsing the canonical form back is
    /// idempotent.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "ctrl+")?;
        }
        if self.win {
            write!(f, "win+")?;
        }
        if self.alt {
            write!(f, "alt+")?;
        }
        if self.shift {
            write!(f, "shift+")?;
        }
        match key_name(self.trigger_vk) {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "0x{:02x}", self.trigger_vk),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
