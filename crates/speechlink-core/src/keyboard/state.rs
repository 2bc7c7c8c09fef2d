//! Live keyboard state: modifier flags and the forwarded-held set.
//!
//! The forwarded-held set is the safety-critical half of keyboard
//! forwarding.  It contains exactly the keys for which a press has been
//! transmitted to the remote peer without a matching release; draining it on
//! every deactivation is what guarantees no key ever sticks down remotely.

use super::shortcut::ShortcutSpec;
use super::vk::{is_alt, is_ctrl, is_shift, is_win};

/// Modifier flags tracked from the raw event stream, regardless of whether
/// events are currently being forwarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub ctrl: bool,
    pub win: bool,
    pub alt: bool,
    pub shift: bool,
}

/// A key whose press has been forwarded to the remote peer.
///
/// Identity is `vk_code`; the scan code and extended flag are retained so
/// the eventual release frame mirrors the original press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressedKey {
    pub vk_code: u32,
    pub scan_code: u16,
    pub extended: bool,
}

/// Modifier flags plus the forwarded-held set, updated from the hook event
/// stream.
#[derive(Debug, Default)]
pub struct KeyboardState {
    modifiers: ModifierState,
    held: Vec<PressedKey>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current modifier flags.
    pub fn modifiers(&self) -> ModifierState {
        self.modifiers
    }

    /// Updates the modifier flags for an observed press or release.  Called
    /// for every event, forwarded or not, so the flags always reflect the
    /// physical keyboard.
    pub fn update_modifiers(&mut self, vk_code: u32, pressed: bool) {
        if is_ctrl(vk_code) {
            self.modifiers.ctrl = pressed;
        }
        if is_win(vk_code) {
            self.modifiers.win = pressed;
        }
        if is_alt(vk_code) {
            self.modifiers.alt = pressed;
        }
        if is_shift(vk_code) {
            self.modifiers.shift = pressed;
        }
    }

    /// Clears all modifier flags.  Used when the toggle chord fires, because
    /// the chord's own release edges will never be delivered to the state
    /// they were pressed in.
    pub fn reset_modifiers(&mut self) {
        self.modifiers = ModifierState::default();
    }

    /// True when `vk_code` is the configured trigger key and the live
    /// modifier flags equal the specification exactly.  Extra held modifiers
    /// disqualify the chord.
    pub fn is_toggle_shortcut(&self, spec: &ShortcutSpec, vk_code: u32) -> bool {
        vk_code == spec.trigger_vk
            && self.modifiers.ctrl == spec.ctrl
            && self.modifiers.win == spec.win
            && self.modifiers.alt == spec.alt
            && self.modifiers.shift == spec.shift
    }

    /// Records a forwarded press.  Idempotent on key-repeat: a vk code
    /// already in the set is not inserted again.
    pub fn track_press(&mut self, vk_code: u32, scan_code: u16, extended: bool) {
        if !self.held.iter().any(|key| key.vk_code == vk_code) {
            self.held.push(PressedKey { vk_code, scan_code, extended });
        }
    }

    /// Removes a key from the forwarded-held set after its release has been
    /// forwarded.
    pub fn track_release(&mut self, vk_code: u32) {
        self.held.retain(|key| key.vk_code != vk_code);
    }

    /// Empties the forwarded-held set, returning the previous contents in
    /// insertion order so the caller can emit release frames for each.
    pub fn clear_pressed(&mut self) -> Vec<PressedKey> {
        std::mem::take(&mut self.held)
    }

    /// Number of keys currently held remotely.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::vk::{VK_F11, VK_LCONTROL, VK_LSHIFT, VK_LWIN, VK_RMENU};

    #[test]
    fn test_update_modifiers_tracks_press_and_release() {
        let mut state = KeyboardState::new();
        state.update_modifiers(VK_LCONTROL, true);
        state.update_modifiers(VK_RMENU, true);
        assert_eq!(
            state.modifiers(),
            ModifierState { ctrl: true, alt: true, ..Default::default() }
        );
        state.update_modifiers(VK_LCONTROL, false);
        assert!(!state.modifiers().ctrl);
        assert!(state.modifiers().alt);
    }

    #[test]
    fn test_non_modifier_keys_do_not_touch_flags() {
        let mut state = KeyboardState::new();
        state.update_modifiers(0x41, true);
        assert_eq!(state.modifiers(), ModifierState::default());
    }

    #[test]
    fn test_toggle_shortcut_matches_exact_chord() {
        let spec = ShortcutSpec::default(); // ctrl+win+f11
        let mut state = KeyboardState::new();
        state.update_modifiers(VK_LCONTROL, true);
        state.update_modifiers(VK_LWIN, true);
        assert!(state.is_toggle_shortcut(&spec, VK_F11));
        assert!(!state.is_toggle_shortcut(&spec, 0x41));
    }

    #[test]
    fn test_toggle_shortcut_rejects_extra_modifier() {
        // Configured ctrl+f11; user holds ctrl+shift and presses F11.
        let spec = ShortcutSpec::parse("ctrl+f11");
        let mut state = KeyboardState::new();
        state.update_modifiers(VK_LCONTROL, true);
        state.update_modifiers(VK_LSHIFT, true);
        assert!(!state.is_toggle_shortcut(&spec, VK_F11));

        state.update_modifiers(VK_LSHIFT, false);
        assert!(state.is_toggle_shortcut(&spec, VK_F11));
    }

    #[test]
    fn test_toggle_shortcut_rejects_missing_modifier() {
        let spec = ShortcutSpec::default();
        let mut state = KeyboardState::new();
        state.update_modifiers(VK_LCONTROL, true);
        assert!(!state.is_toggle_shortcut(&spec, VK_F11));
    }

    #[test]
    fn test_track_press_is_idempotent_on_key_repeat() {
        let mut state = KeyboardState::new();
        state.track_press(65, 30, false);
        state.track_press(65, 30, false);
        state.track_press(65, 30, false);
        assert_eq!(state.held_count(), 1);
    }

    #[test]
    fn test_track_release_removes_only_the_released_key() {
        let mut state = KeyboardState::new();
        state.track_press(65, 30, false);
        state.track_press(160, 42, false);
        state.track_release(65);
        assert_eq!(state.held_count(), 1);
        assert_eq!(state.clear_pressed()[0].vk_code, 160);
    }

    #[test]
    fn test_clear_pressed_returns_keys_in_insertion_order() {
        let mut state = KeyboardState::new();
        state.track_press(65, 30, false);
        state.track_press(160, 42, false);
        state.track_press(0x5A, 44, true);

        let drained = state.clear_pressed();
        let codes: Vec<u32> = drained.iter().map(|key| key.vk_code).collect();
        assert_eq!(codes, vec![65, 160, 0x5A]);
        assert!(drained[2].extended);
        assert_eq!(state.held_count(), 0);
    }

    #[test]
    fn test_reset_modifiers_clears_all_flags() {
        let mut state = KeyboardState::new();
        state.update_modifiers(VK_LCONTROL, true);
        state.update_modifiers(VK_LWIN, true);
        state.reset_modifiers();
        assert_eq!(state.modifiers(), ModifierState::default());
    }
}
