use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{Flags, KeyCode};

/// Kind of a keyboard event.
///
/// The discriminants are the values the keyboard driver uses:
///   10 == key down
///   11 == key up
///   12 == modifier key changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum EventType {
    Down = 10,
    Up = 11,
    Modify = 12,
}

impl EventType {
    /// Create EventType from the driver value
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            10 => Some(EventType::Down),
            11 => Some(EventType::Up),
            12 => Some(EventType::Modify),
            _ => None,
        }
    }

    /// Convert to the driver value
    pub fn to_u32(self) -> u32 {
        self as u32
    }
}

/// Hardware keyboard layout identifier reported with each event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyboardType(pub u32);

impl KeyboardType {
    pub const NONE: KeyboardType = KeyboardType(0);
    pub const MACBOOK: KeyboardType = KeyboardType(37);
    pub const ANSI: KeyboardType = KeyboardType(40);
    pub const JIS: KeyboardType = KeyboardType(42);
}

impl fmt::Display for KeyboardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reasons a key event is refused on the forwarding path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("invalid key {key} (event type {event_type})")]
    InvalidKey { key: KeyCode, event_type: EventType },

    #[error("modify event for non-modifier key {0}")]
    NotAModifierKey(KeyCode),
}

/// A single keyboard event as delivered through the keyboard event slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub event_type: EventType,
    pub flags: Flags,
    pub key: KeyCode,
    pub char_code: u32,
    pub char_set: u32,
    pub orig_char_code: u32,
    pub orig_char_set: u32,
    pub keyboard_type: KeyboardType,
    pub repeat: bool,
}

impl KeyEvent {
    pub fn new(event_type: EventType, key: KeyCode, flags: Flags) -> Self {
        Self {
            event_type,
            flags,
            key,
            char_code: 0,
            char_set: 0,
            orig_char_code: 0,
            orig_char_set: 0,
            keyboard_type: KeyboardType::NONE,
            repeat: false,
        }
    }

    pub fn down(key: KeyCode, flags: Flags) -> Self {
        Self::new(EventType::Down, key, flags)
    }

    pub fn up(key: KeyCode, flags: Flags) -> Self {
        Self::new(EventType::Up, key, flags)
    }

    pub fn modify(key: KeyCode, flags: Flags) -> Self {
        Self::new(EventType::Modify, key, flags)
    }

    pub fn with_keyboard_type(mut self, keyboard_type: KeyboardType) -> Self {
        self.keyboard_type = keyboard_type;
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    /// Check the event invariants required before forwarding.
    ///
    /// The key must be below the virtual key boundary, and a modify event must
    /// carry a modifier key.
    pub fn validate(&self) -> Result<(), EventError> {
        if !self.key.is_valid() {
            return Err(EventError::InvalidKey {
                key: self.key,
                event_type: self.event_type,
            });
        }
        if self.event_type == EventType::Modify && !self.key.is_modifier() {
            return Err(EventError::NotAModifierKey(self.key));
        }
        Ok(())
    }

    /// Whether this event presses its key.
    ///
    /// For modify events this is derived from the key's own flag.
    pub fn is_key_down(&self) -> bool {
        match self.event_type {
            EventType::Down => true,
            EventType::Up => false,
            EventType::Modify => self
                .key
                .modifier_flag()
                .map(|flag| self.flags.contains(flag))
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} key:{} flags:{} kbdtype:{}{}",
            self.event_type,
            self.key,
            self.flags,
            self.keyboard_type,
            if self.repeat { " repeat" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModifierFlag;

    #[test]
    fn test_event_type_from_u32() {
        assert_eq!(EventType::from_u32(10), Some(EventType::Down));
        assert_eq!(EventType::from_u32(11), Some(EventType::Up));
        assert_eq!(EventType::from_u32(12), Some(EventType::Modify));
        assert_eq!(EventType::from_u32(13), None);
        assert_eq!(EventType::Modify.to_u32(), 12);
    }

    #[test]
    fn test_validate_accepts_regular_events() {
        assert!(KeyEvent::down(KeyCode::A, Flags::empty()).validate().is_ok());
        assert!(KeyEvent::modify(KeyCode::SHIFT_L, ModifierFlag::ShiftL.into())
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_virtual_key() {
        let event = KeyEvent::down(KeyCode::VK_BEGIN, Flags::empty());
        assert_eq!(
            event.validate(),
            Err(EventError::InvalidKey {
                key: KeyCode::VK_BEGIN,
                event_type: EventType::Down
            })
        );
    }

    #[test]
    fn test_validate_rejects_modify_for_regular_key() {
        let event = KeyEvent::modify(KeyCode::A, Flags::empty());
        assert_eq!(event.validate(), Err(EventError::NotAModifierKey(KeyCode::A)));
    }

    #[test]
    fn test_is_key_down_for_modify() {
        let pressed = KeyEvent::modify(KeyCode::SHIFT_L, ModifierFlag::ShiftL.into());
        let released = KeyEvent::modify(KeyCode::SHIFT_L, Flags::empty());
        assert!(pressed.is_key_down());
        assert!(!released.is_key_down());
        assert!(KeyEvent::down(KeyCode::A, Flags::empty()).is_key_down());
        assert!(!KeyEvent::up(KeyCode::A, Flags::empty()).is_key_down());
    }
}
