// Hookmap Modifier System
// Named modifier flags and the flag set carried by every key event

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter, EnumString, FromRepr};

use crate::KeyCode;

/// A single named modifier flag.
///
/// The `repr` value is the ordinal used in the rule stream; the device mask is
/// what the keyboard driver reports in its raw flag word.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    EnumCountMacro,
    FromRepr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ModifierFlag {
    CapsLock = 0,
    ShiftL = 1,
    ShiftR = 2,
    ControlL = 3,
    ControlR = 4,
    OptionL = 5,
    OptionR = 6,
    CommandL = 7,
    CommandR = 8,
    /// Synthetic marker set on events that originate from the numeric keypad
    Numpad = 9,
    Fn = 10,
}

/// Static (flag, key, device mask) table.
///
/// `Numpad` has no physical key.
const MODIFIER_TABLE: &[(ModifierFlag, Option<KeyCode>, u32)] = &[
    (ModifierFlag::CapsLock, Some(KeyCode::CAPSLOCK), 0x0001_0000),
    (ModifierFlag::ShiftL, Some(KeyCode::SHIFT_L), 0x0002_0002),
    (ModifierFlag::ShiftR, Some(KeyCode::SHIFT_R), 0x0002_0004),
    (ModifierFlag::ControlL, Some(KeyCode::CONTROL_L), 0x0004_0001),
    (ModifierFlag::ControlR, Some(KeyCode::CONTROL_R), 0x0004_2000),
    (ModifierFlag::OptionL, Some(KeyCode::OPTION_L), 0x0008_0020),
    (ModifierFlag::OptionR, Some(KeyCode::OPTION_R), 0x0008_0040),
    (ModifierFlag::CommandL, Some(KeyCode::COMMAND_L), 0x0010_0008),
    (ModifierFlag::CommandR, Some(KeyCode::COMMAND_R), 0x0010_0010),
    (ModifierFlag::Numpad, None, 0x0020_0000),
    (ModifierFlag::Fn, Some(KeyCode::FN), 0x0080_0000),
];

impl ModifierFlag {
    /// Decode a rule stream ordinal
    pub fn from_stream_value(value: u32) -> Option<Self> {
        u8::try_from(value).ok().and_then(Self::from_repr)
    }

    /// Ordinal used in the rule stream
    pub fn stream_value(self) -> u32 {
        self as u32
    }

    /// Raw device mask for this flag
    pub fn device_mask(self) -> u32 {
        MODIFIER_TABLE[self as usize].2
    }

    /// The physical key that toggles this flag
    pub fn key(self) -> Option<KeyCode> {
        MODIFIER_TABLE[self as usize].1
    }

    /// Get the flag toggled by a modifier key
    pub fn from_modifier_key(key: KeyCode) -> Option<Self> {
        MODIFIER_TABLE
            .iter()
            .find(|(_, k, _)| *k == Some(key))
            .map(|(flag, _, _)| *flag)
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// A set of modifier flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags(u16);

impl Flags {
    /// The empty set
    pub const fn empty() -> Self {
        Flags(0)
    }

    /// Set containing a single flag
    pub fn from_flag(flag: ModifierFlag) -> Self {
        Flags(flag.bit())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(self, flag: ModifierFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// True when every flag of `other` is also in `self`
    pub fn contains_all(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, flag: ModifierFlag) {
        self.0 |= flag.bit();
    }

    pub fn remove(&mut self, flag: ModifierFlag) {
        self.0 &= !flag.bit();
    }

    /// Copy of the set with `flag` added
    pub fn with(mut self, flag: ModifierFlag) -> Self {
        self.insert(flag);
        self
    }

    /// Copy of the set with `flag` removed
    pub fn without(mut self, flag: ModifierFlag) -> Self {
        self.remove(flag);
        self
    }

    pub fn union(self, other: Flags) -> Self {
        Flags(self.0 | other.0)
    }

    pub fn difference(self, other: Flags) -> Self {
        Flags(self.0 & !other.0)
    }

    /// Copy of the set with the synthetic numeric keypad marker removed
    pub fn stripped_numpad(self) -> Self {
        self.without(ModifierFlag::Numpad)
    }

    /// Iterate over the flags in the set, in ordinal order
    pub fn iter(self) -> impl Iterator<Item = ModifierFlag> {
        ModifierFlag::iter().filter(move |flag| self.contains(*flag))
    }

    /// Raw driver flag word for this set
    pub fn to_raw(self) -> u32 {
        self.iter().fold(0, |raw, flag| raw | flag.device_mask())
    }

    /// Decode a raw driver flag word.
    ///
    /// Sided modifiers are identified by their device-dependent low bits, the
    /// others by their full mask.
    pub fn from_raw(raw: u32) -> Self {
        let mut flags = Flags::empty();
        for flag in ModifierFlag::iter() {
            let mask = flag.device_mask();
            let bits = if mask & 0xffff != 0 { mask & 0xffff } else { mask };
            if raw & bits != 0 {
                flags.insert(flag);
            }
        }
        flags
    }
}

impl From<ModifierFlag> for Flags {
    fn from(flag: ModifierFlag) -> Self {
        Flags::from_flag(flag)
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        self.union(rhs)
    }
}

impl BitOr<ModifierFlag> for Flags {
    type Output = Flags;

    fn bitor(self, rhs: ModifierFlag) -> Flags {
        self.with(rhs)
    }
}

impl BitOrAssign<ModifierFlag> for Flags {
    fn bitor_assign(&mut self, rhs: ModifierFlag) {
        self.insert(rhs);
    }
}

impl FromIterator<ModifierFlag> for Flags {
    fn from_iter<I: IntoIterator<Item = ModifierFlag>>(iter: I) -> Self {
        let mut flags = Flags::empty();
        for flag in iter {
            flags.insert(flag);
        }
        flags
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<String> = self.iter().map(|flag| flag.to_string()).collect();
        write!(f, "{}", names.join("|"))
    }
}

// Compile-time check that the table covers every flag in ordinal order
const _: () = assert!(MODIFIER_TABLE.len() == ModifierFlag::COUNT);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_in_ordinal_order() {
        for (index, (flag, _, _)) in MODIFIER_TABLE.iter().enumerate() {
            assert_eq!(*flag as usize, index);
        }
    }

    #[test]
    fn test_modifier_from_key() {
        assert_eq!(
            ModifierFlag::from_modifier_key(KeyCode::SHIFT_L),
            Some(ModifierFlag::ShiftL)
        );
        assert_eq!(
            ModifierFlag::from_modifier_key(KeyCode::CAPSLOCK),
            Some(ModifierFlag::CapsLock)
        );
        assert_eq!(ModifierFlag::from_modifier_key(KeyCode::A), None);
        assert_eq!(ModifierFlag::Numpad.key(), None);
    }

    #[test]
    fn test_stream_value_round_trip() {
        assert_eq!(
            ModifierFlag::from_stream_value(ModifierFlag::Fn.stream_value()),
            Some(ModifierFlag::Fn)
        );
        assert_eq!(ModifierFlag::from_stream_value(11), None);
        assert_eq!(ModifierFlag::from_stream_value(0x1_0000), None);
    }

    #[test]
    fn test_flag_names() {
        assert_eq!(ModifierFlag::CapsLock.to_string(), "caps_lock");
        assert_eq!("shift_l".parse::<ModifierFlag>(), Ok(ModifierFlag::ShiftL));
        assert_eq!("NUMPAD".parse::<ModifierFlag>(), Ok(ModifierFlag::Numpad));
    }

    #[test]
    fn test_set_operations() {
        let flags = Flags::empty() | ModifierFlag::ShiftL | ModifierFlag::CommandL;
        assert_eq!(flags.len(), 2);
        assert!(flags.contains(ModifierFlag::ShiftL));
        assert!(!flags.contains(ModifierFlag::ShiftR));

        let required = Flags::from_flag(ModifierFlag::CommandL);
        assert!(flags.contains_all(required));
        assert!(!required.contains_all(flags));
        assert!(flags.contains_all(Flags::empty()));

        assert_eq!(flags.difference(required), Flags::from(ModifierFlag::ShiftL));
    }

    #[test]
    fn test_stripped_numpad() {
        let flags = Flags::empty() | ModifierFlag::Numpad | ModifierFlag::Fn;
        let stripped = flags.stripped_numpad();
        assert!(!stripped.contains(ModifierFlag::Numpad));
        assert!(stripped.contains(ModifierFlag::Fn));
    }

    #[test]
    fn test_raw_keeps_sides_apart() {
        let left = Flags::from_flag(ModifierFlag::ShiftL);
        assert_eq!(left.to_raw(), 0x0002_0002);
        assert_eq!(Flags::from_raw(left.to_raw()), left);

        let both = left | ModifierFlag::ShiftR | ModifierFlag::CapsLock;
        assert_eq!(Flags::from_raw(both.to_raw()), both);

        // Removing one side must not drop the other
        let right_only = both.without(ModifierFlag::ShiftL);
        assert_eq!(
            Flags::from_raw(right_only.to_raw()),
            Flags::empty() | ModifierFlag::ShiftR | ModifierFlag::CapsLock
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Flags::empty().to_string(), "none");
        let flags = Flags::empty() | ModifierFlag::Numpad | ModifierFlag::CapsLock;
        assert_eq!(flags.to_string(), "caps_lock|numpad");
    }
}
