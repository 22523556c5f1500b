// Hookmap Remap Rules
// Rule variants built from the configuration stream and their capabilities

mod drop_key;
mod force_num_lock_on;
mod key_to_key;
mod keyboard_type;
mod list;
pub mod stream;

use std::time::Duration;

use smallvec::SmallVec;

use crate::device::DeviceIdentifier;
use crate::event::{KeyEvent, KeyboardType};
use crate::Flags;

pub use drop_key::DropKeyAfterRemap;
pub use force_num_lock_on::ForceNumLockOn;
pub use key_to_key::{KeyToKey, KeyToKeyOption, ToEvent};
pub use keyboard_type::SetKeyboardType;
pub use list::RuleList;
pub use stream::{decode_words, encode_words, AddDataType, AddValue, RemapType, RulePair, RuleRecord, StreamError};

#[cfg(feature = "config-file")]
pub use stream::records_from_toml;

/// A rejected `add` while building a rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleBuildError {
    #[error("{rule}: unexpected {tag} while expecting {expected}")]
    UnexpectedData {
        rule: RemapType,
        tag: AddDataType,
        expected: &'static str,
    },

    #[error("{rule}: modifier flag with no event to attach it to")]
    NoEventForFlag { rule: RemapType },

    #[error("invalid key code {0:#x}")]
    InvalidKeyCode(u32),

    #[error("invalid modifier flag {0}")]
    InvalidModifierFlag(u32),

    #[error("invalid key-to-key option {0}")]
    InvalidOption(u32),
}

/// Repeat timing used when a rule does not set its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatDefaults {
    pub delay_until_repeat: Duration,
    pub key_repeat: Duration,
}

impl Default for RepeatDefaults {
    fn default() -> Self {
        Self {
            delay_until_repeat: Duration::from_millis(500),
            key_repeat: Duration::from_millis(83),
        }
    }
}

/// Request for the key repeat registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatDirective {
    Start {
        id: usize,
        event: KeyEvent,
        delay: Duration,
        interval: Duration,
    },
    Cancel {
        id: usize,
    },
}

/// Events produced by a consuming rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapOutput {
    pub events: SmallVec<[KeyEvent; 8]>,
    pub repeat: Option<RepeatDirective>,
}

/// One configured rule.
///
/// Immutable once built; the key-to-key pressing state is kept by
/// [`RuleList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemapRule {
    KeyToKey(KeyToKey),
    ForceNumLockOn(ForceNumLockOn),
    DropKeyAfterRemap(DropKeyAfterRemap),
    SetKeyboardType(SetKeyboardType),
}

impl RemapRule {
    /// Empty rule of the given type
    pub fn new(remap_type: RemapType) -> Self {
        match remap_type {
            RemapType::KeyToKey => RemapRule::KeyToKey(KeyToKey::new()),
            RemapType::ForceNumLockOn => RemapRule::ForceNumLockOn(ForceNumLockOn::new()),
            RemapType::DropKeyAfterRemap => RemapRule::DropKeyAfterRemap(DropKeyAfterRemap::new()),
            RemapType::SetKeyboardType => RemapRule::SetKeyboardType(SetKeyboardType::new()),
        }
    }

    pub fn remap_type(&self) -> RemapType {
        match self {
            RemapRule::KeyToKey(_) => RemapType::KeyToKey,
            RemapRule::ForceNumLockOn(_) => RemapType::ForceNumLockOn,
            RemapRule::DropKeyAfterRemap(_) => RemapType::DropKeyAfterRemap,
            RemapRule::SetKeyboardType(_) => RemapType::SetKeyboardType,
        }
    }

    /// Feed one configuration pair
    pub fn add(&mut self, tag: AddDataType, value: AddValue) -> Result<(), RuleBuildError> {
        if tag == AddDataType::Option
            && KeyToKeyOption::from_repr(value.get()) == Some(KeyToKeyOption::IgnorePassThrough)
        {
            *self.ignore_pass_through_mut() = true;
            return Ok(());
        }
        match self {
            RemapRule::KeyToKey(rule) => rule.add(tag, value),
            RemapRule::ForceNumLockOn(rule) => rule.add(tag, value),
            RemapRule::DropKeyAfterRemap(rule) => rule.add(tag, value),
            RemapRule::SetKeyboardType(rule) => rule.add(tag, value),
        }
    }

    /// Whether the rule stays active in pass-through mode
    pub fn ignore_pass_through(&self) -> bool {
        match self {
            RemapRule::KeyToKey(rule) => rule.ignore_pass_through,
            RemapRule::ForceNumLockOn(rule) => rule.ignore_pass_through,
            RemapRule::DropKeyAfterRemap(rule) => rule.ignore_pass_through,
            RemapRule::SetKeyboardType(rule) => rule.ignore_pass_through,
        }
    }

    fn ignore_pass_through_mut(&mut self) -> &mut bool {
        match self {
            RemapRule::KeyToKey(rule) => &mut rule.ignore_pass_through,
            RemapRule::ForceNumLockOn(rule) => &mut rule.ignore_pass_through,
            RemapRule::DropKeyAfterRemap(rule) => &mut rule.ignore_pass_through,
            RemapRule::SetKeyboardType(rule) => &mut rule.ignore_pass_through,
        }
    }

    /// Try to consume `event`, appending replacement events to `out`
    pub fn remap(
        &self,
        event: &KeyEvent,
        pressing: &mut bool,
        repeat_id: usize,
        defaults: &RepeatDefaults,
        out: &mut RemapOutput,
    ) -> bool {
        match self {
            RemapRule::KeyToKey(rule) => rule.remap(event, pressing, repeat_id, defaults, out),
            _ => false,
        }
    }

    /// Whether the forwarding stage should discard `event`
    pub fn drop(&self, event: &KeyEvent) -> bool {
        match self {
            RemapRule::DropKeyAfterRemap(rule) => rule.drop(event),
            _ => false,
        }
    }

    pub fn remap_simultaneous_key_presses(&self) -> bool {
        false
    }

    pub fn remap_set_keyboard_type(&self, keyboard_type: &mut KeyboardType, flags: Flags) -> bool {
        match self {
            RemapRule::SetKeyboardType(rule) => rule.remap_set_keyboard_type(keyboard_type, flags),
            _ => false,
        }
    }

    /// Whether the num lock hack applies to the device with `identifier`
    pub fn remap_force_num_lock_on(&self, identifier: &DeviceIdentifier) -> bool {
        match self {
            RemapRule::ForceNumLockOn(rule) => rule.matches(identifier),
            _ => false,
        }
    }

    /// Event whose release unblocks held input, for rules that block
    pub fn block_until_key_up_event(&self) -> Option<&KeyEvent> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_matches_type() {
        for remap_type in [
            RemapType::KeyToKey,
            RemapType::ForceNumLockOn,
            RemapType::DropKeyAfterRemap,
            RemapType::SetKeyboardType,
        ] {
            assert_eq!(RemapRule::new(remap_type).remap_type(), remap_type);
        }
    }

    #[test]
    fn test_capabilities_default_to_noop() {
        let rule = RemapRule::new(RemapType::ForceNumLockOn);
        let event = KeyEvent::down(crate::KeyCode::A, Flags::empty());
        let mut pressing = false;
        let mut out = RemapOutput::default();

        assert!(!rule.remap(&event, &mut pressing, 0, &RepeatDefaults::default(), &mut out));
        assert!(!rule.drop(&event));
        assert!(!rule.remap_simultaneous_key_presses());
        assert!(rule.block_until_key_up_event().is_none());
        assert!(out.events.is_empty());

        let mut keyboard_type = KeyboardType::ANSI;
        assert!(!rule.remap_set_keyboard_type(&mut keyboard_type, Flags::empty()));
        assert_eq!(keyboard_type, KeyboardType::ANSI);
    }

    #[test]
    fn test_ignore_pass_through_option_for_every_type() {
        let option = AddValue(KeyToKeyOption::IgnorePassThrough as u32);
        for remap_type in [
            RemapType::KeyToKey,
            RemapType::ForceNumLockOn,
            RemapType::DropKeyAfterRemap,
            RemapType::SetKeyboardType,
        ] {
            let mut rule = RemapRule::new(remap_type);
            assert!(!rule.ignore_pass_through());
            rule.add(AddDataType::Option, option).unwrap();
            assert!(rule.ignore_pass_through(), "{}", remap_type);
        }
    }

    #[test]
    fn test_ignore_pass_through_keeps_build_phase() {
        let mut rule = RemapRule::new(RemapType::ForceNumLockOn);
        rule.add(AddDataType::DeviceVendor, AddValue(0x05ac)).unwrap();
        rule.add(AddDataType::Option, AddValue(KeyToKeyOption::IgnorePassThrough as u32))
            .unwrap();
        rule.add(AddDataType::DeviceProduct, AddValue(0x0250)).unwrap();
        rule.add(AddDataType::DeviceLocation, AddValue(1)).unwrap();
        assert!(rule.remap_force_num_lock_on(&DeviceIdentifier::new(0x05ac, 0x0250, 1)));
    }
}
