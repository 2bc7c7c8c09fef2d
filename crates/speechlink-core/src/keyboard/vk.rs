//! Windows virtual-key codes and key-name translation.
//!
//! # What is a virtual-key code?
//!
//! Windows assigns each keyboard key a number called a Virtual Key code,
//! defined in `<winuser.h>` and named `VK_*` (e.g. `VK_RETURN = 0x0D`).  They
//! are "virtual" because they identify *logical* keys rather than physical
//! scan codes: pressing the letter A produces `VK_A = 0x41` on any layout.
//! The relay protocol passes these codes through opaquely, so the same
//! constants are used on every platform this client builds for.
//!
//! Only the keys that can appear in a toggle-shortcut specification need
//! names here; everything else is forwarded as a bare number.

// ── Modifier keys ─────────────────────────────────────────────────────────────

pub const VK_SHIFT: u32 = 0x10;
pub const VK_CONTROL: u32 = 0x11;
pub const VK_MENU: u32 = 0x12; // Alt
pub const VK_LWIN: u32 = 0x5B;
pub const VK_RWIN: u32 = 0x5C;
pub const VK_LSHIFT: u32 = 0xA0;
pub const VK_RSHIFT: u32 = 0xA1;
pub const VK_LCONTROL: u32 = 0xA2;
pub const VK_RCONTROL: u32 = 0xA3;
pub const VK_LMENU: u32 = 0xA4;
pub const VK_RMENU: u32 = 0xA5;

// ── Named non-modifier keys ───────────────────────────────────────────────────

pub const VK_BACK: u32 = 0x08;
pub const VK_TAB: u32 = 0x09;
pub const VK_RETURN: u32 = 0x0D;
pub const VK_PAUSE: u32 = 0x13;
pub const VK_CAPITAL: u32 = 0x14;
pub const VK_ESCAPE: u32 = 0x1B;
pub const VK_SPACE: u32 = 0x20;
pub const VK_PRIOR: u32 = 0x21; // Page Up
pub const VK_NEXT: u32 = 0x22; // Page Down
pub const VK_END: u32 = 0x23;
pub const VK_HOME: u32 = 0x24;
pub const VK_LEFT: u32 = 0x25;
pub const VK_UP: u32 = 0x26;
pub const VK_RIGHT: u32 = 0x27;
pub const VK_DOWN: u32 = 0x28;
pub const VK_SNAPSHOT: u32 = 0x2C; // Print Screen
pub const VK_INSERT: u32 = 0x2D;
pub const VK_DELETE: u32 = 0x2E;
pub const VK_NUMLOCK: u32 = 0x90;

/// `VK_F1`; function keys are contiguous through `VK_F24 = 0x87`.
pub const VK_F1: u32 = 0x70;
pub const VK_F11: u32 = 0x7A;

/// Named keys recognised in shortcut specifications, canonical name first.
/// The canonical name is what [`key_name`] returns for `Display`.
const NAMED_KEYS: &[(&str, u32)] = &[
    ("space", VK_SPACE),
    ("enter", VK_RETURN),
    ("return", VK_RETURN),
    ("escape", VK_ESCAPE),
    ("esc", VK_ESCAPE),
    ("tab", VK_TAB),
    ("up", VK_UP),
    ("down", VK_DOWN),
    ("left", VK_LEFT),
    ("right", VK_RIGHT),
    ("home", VK_HOME),
    ("end", VK_END),
    ("pageup", VK_PRIOR),
    ("pgup", VK_PRIOR),
    ("pagedown", VK_NEXT),
    ("pgdn", VK_NEXT),
    ("insert", VK_INSERT),
    ("ins", VK_INSERT),
    ("delete", VK_DELETE),
    ("del", VK_DELETE),
    ("backspace", VK_BACK),
    ("bs", VK_BACK),
    ("pause", VK_PAUSE),
    ("printscreen", VK_SNAPSHOT),
    ("capslock", VK_CAPITAL),
    ("numlock", VK_NUMLOCK),
];

const LETTER_NAMES: [&str; 26] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z",
];

const DIGIT_NAMES: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

const FUNCTION_NAMES: [&str; 24] = [
    "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "f13", "f14",
    "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24",
];

/// Resolves a (case-insensitive) key name from a shortcut specification to
/// its virtual-key code.  Returns `None` for unrecognised names.
pub fn parse_key_name(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();

    // f1..f24
    if let Some(digits) = name.strip_prefix('f') {
        if !digits.is_empty() {
            if let Ok(n) = digits.parse::<u32>() {
                if (1..=24).contains(&n) {
                    return Some(VK_F1 + (n - 1));
                }
            }
        }
    }

    // Single letters and digits map to their ASCII uppercase code.
    if name.len() == 1 {
        let c = name.as_bytes()[0];
        if c.is_ascii_lowercase() {
            return Some(u32::from(c.to_ascii_uppercase()));
        }
        if c.is_ascii_digit() {
            return Some(u32::from(c));
        }
    }

    NAMED_KEYS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|&(_, vk)| vk)
}

/// Canonical display name for a virtual-key code, if it has one.
pub fn key_name(vk: u32) -> Option<&'static str> {
    if (0x41..=0x5A).contains(&vk) {
        return Some(LETTER_NAMES[(vk - 0x41) as usize]);
    }
    if (0x30..=0x39).contains(&vk) {
        return Some(DIGIT_NAMES[(vk - 0x30) as usize]);
    }
    if (VK_F1..VK_F1 + 24).contains(&vk) {
        return Some(FUNCTION_NAMES[(vk - VK_F1) as usize]);
    }
    NAMED_KEYS
        .iter()
        .find(|&&(_, candidate)| candidate == vk)
        .map(|&(name, _)| name)
}

/// True for any Control key variant (generic, left, or right).
pub fn is_ctrl(vk: u32) -> bool {
    matches!(vk, VK_CONTROL | VK_LCONTROL | VK_RCONTROL)
}

/// True for either Windows key.
pub fn is_win(vk: u32) -> bool {
    matches!(vk, VK_LWIN | VK_RWIN)
}

/// True for any Alt key variant.
pub fn is_alt(vk: u32) -> bool {
    matches!(vk, VK_MENU | VK_LMENU | VK_RMENU)
}

/// True for any Shift key variant.
pub fn is_shift(vk: u32) -> bool {
    matches!(vk, VK_SHIFT | VK_LSHIFT | VK_RSHIFT)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_function_keys_across_the_full_range() {
        assert_eq!(parse_key_name("f1"), Some(VK_F1));
        assert_eq!(parse_key_name("F11"), Some(VK_F11));
        assert_eq!(parse_key_name("f24"), Some(VK_F1 + 23));
        assert_eq!(parse_key_name("f25"), None);
        assert_eq!(parse_key_name("f0"), None);
    }

    #[test]
    fn test_parse_letters_and_digits() {
        assert_eq!(parse_key_name("a"), Some(0x41));
        assert_eq!(parse_key_name("Z"), Some(0x5A));
        assert_eq!(parse_key_name("0"), Some(0x30));
        assert_eq!(parse_key_name("9"), Some(0x39));
    }

    #[test]
    fn test_parse_named_keys_with_aliases() {
        assert_eq!(parse_key_name("enter"), Some(VK_RETURN));
        assert_eq!(parse_key_name("return"), Some(VK_RETURN));
        assert_eq!(parse_key_name("PGDN"), Some(VK_NEXT));
        assert_eq!(parse_key_name("printscreen"), Some(VK_SNAPSHOT));
    }

    #[test]
    fn test_parse_unknown_name_returns_none() {
        assert_eq!(parse_key_name("hyper"), None);
        assert_eq!(parse_key_name(""), None);
    }

    #[test]
    fn test_key_name_round_trips_for_every_parsable_name() {
        for name in LETTER_NAMES
            .iter()
            .chain(DIGIT_NAMES.iter())
            .chain(FUNCTION_NAMES.iter())
        {
            let vk = parse_key_name(name).expect("name must parse");
            assert_eq!(key_name(vk), Some(*name));
        }
    }

    #[test]
    fn test_key_name_prefers_canonical_alias() {
        assert_eq!(key_name(VK_RETURN), Some("enter"));
        assert_eq!(key_name(VK_PRIOR), Some("pageup"));
    }

    #[test]
    fn test_modifier_classification_covers_left_and_right_variants() {
        assert!(is_ctrl(VK_CONTROL) && is_ctrl(VK_LCONTROL) && is_ctrl(VK_RCONTROL));
        assert!(is_win(VK_LWIN) && is_win(VK_RWIN));
        assert!(is_alt(VK_MENU) && is_alt(VK_LMENU) && is_alt(VK_RMENU));
        assert!(is_shift(VK_SHIFT) && is_shift(VK_LSHIFT) && is_shift(VK_RSHIFT));
        assert!(!is_ctrl(VK_F11) && !is_win(0x41));
    }
}
