// Hookmap Key Type
// Represents a single hardware key code on the keyboard driver path

use std::fmt;
use std::str::FromStr;

use crate::modifier::ModifierFlag;

include!(concat!(env!("OUT_DIR"), "/key_codes.rs"));

impl KeyCode {
    /// First virtual key code. Everything at or above it is invalid on the
    /// driver path.
    pub const VK_BEGIN: KeyCode = KeyCode(0x200);

    /// Get the raw numeric code value
    pub fn code(self) -> u32 {
        self.0
    }

    /// Get the name of this key, if it has one
    pub fn name(self) -> Option<&'static str> {
        key_name(self.0)
    }

    /// Check whether the code is below the virtual key boundary
    pub fn is_valid(self) -> bool {
        self < Self::VK_BEGIN
    }

    /// Check if this key is one of the modifier keys
    pub fn is_modifier(self) -> bool {
        self.modifier_flag().is_some()
    }

    /// The modifier flag this key toggles, if it is a modifier key
    pub fn modifier_flag(self) -> Option<ModifierFlag> {
        ModifierFlag::from_modifier_key(self)
    }
}

/// Display name for a key code
pub fn key_name(code: u32) -> Option<&'static str> {
    KEY_NAMES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}

/// Look up a key code by name (case-insensitive).
///
/// Bare digits resolve to the number row ("1" -> KEY_1), and `0x` prefixed
/// hex literals are accepted for unnamed codes.
pub fn key_from_name(name: &str) -> Option<KeyCode> {
    let name_upper = name.trim().to_uppercase();

    if let Some(hex) = name_upper.strip_prefix("0X") {
        return u32::from_str_radix(hex, 16).ok().map(KeyCode);
    }

    let lookup = if name_upper.len() == 1 && name_upper.chars().all(|c| c.is_ascii_digit()) {
        format!("KEY_{}", name_upper)
    } else {
        name_upper
    };

    KEY_NAMES
        .iter()
        .find(|(n, _)| *n == lookup)
        .map(|(_, code)| KeyCode(*code))
}
