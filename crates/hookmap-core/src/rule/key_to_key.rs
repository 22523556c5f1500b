// Hookmap Key-to-Key Rule
// Replaces one key (with required modifiers) by a sequence of key events

use std::time::Duration;

use smallvec::SmallVec;
use strum_macros::{Display, EnumString, FromRepr};

use crate::event::{EventType, KeyEvent};
use crate::{Flags, KeyCode, ModifierFlag};

use super::stream::{AddDataType, AddValue, RemapType};
use super::{RemapOutput, RepeatDefaults, RepeatDirective, RuleBuildError};

/// Behavior switches carried by `AddDataType::Option`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, FromRepr)]
#[repr(u32)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum KeyToKeyOption {
    /// Never start key repeat for the last to key
    NoRepeat = 1,
    /// Following key codes go to the before-key-down sequence
    BeforeKeyDown = 2,
    /// Following key codes go to the after-key-up sequence
    AfterKeyUp = 3,
    /// Following key codes go to the main sequence
    ToKeys = 4,
    /// Keep the rule active in pass-through mode; accepted by every rule type
    IgnorePassThrough = 5,
}

/// One key of an output sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToEvent {
    pub key: KeyCode,
    pub flags: Flags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    From,
    FromModifiers,
    ToEvents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sequence {
    Before,
    To,
    After,
}

type ToEvents = SmallVec<[ToEvent; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyToKey {
    phase: Phase,
    from_key: Option<KeyCode>,
    from_flags: Flags,
    // from_flags without the from key's own flag
    pure_flags: Flags,
    to_keys: ToEvents,
    before_keys: ToEvents,
    after_keys: ToEvents,
    current: Sequence,
    repeat_enabled: bool,
    delay_until_repeat: i32,
    key_repeat: i32,
    pub(super) ignore_pass_through: bool,
}

impl KeyToKey {
    pub fn new() -> Self {
        Self {
            phase: Phase::From,
            from_key: None,
            from_flags: Flags::empty(),
            pure_flags: Flags::empty(),
            to_keys: SmallVec::new(),
            before_keys: SmallVec::new(),
            after_keys: SmallVec::new(),
            current: Sequence::To,
            repeat_enabled: true,
            delay_until_repeat: -1,
            key_repeat: -1,
            ignore_pass_through: false,
        }
    }

    pub fn from_key(&self) -> Option<KeyCode> {
        self.from_key
    }

    pub fn from_flags(&self) -> Flags {
        self.from_flags
    }

    pub fn to_keys(&self) -> &[ToEvent] {
        &self.to_keys
    }

    pub fn before_keys(&self) -> &[ToEvent] {
        &self.before_keys
    }

    pub fn after_keys(&self) -> &[ToEvent] {
        &self.after_keys
    }

    pub fn is_repeat_enabled(&self) -> bool {
        self.repeat_enabled
    }

    fn current_mut(&mut self) -> &mut ToEvents {
        match self.current {
            Sequence::Before => &mut self.before_keys,
            Sequence::To => &mut self.to_keys,
            Sequence::After => &mut self.after_keys,
        }
    }

    fn unexpected(tag: AddDataType, expected: &'static str) -> RuleBuildError {
        RuleBuildError::UnexpectedData {
            rule: RemapType::KeyToKey,
            tag,
            expected,
        }
    }

    pub fn add(&mut self, tag: AddDataType, value: AddValue) -> Result<(), RuleBuildError> {
        match tag {
            AddDataType::KeyCode => {
                let key = KeyCode(value.get());
                if !key.is_valid() {
                    return Err(RuleBuildError::InvalidKeyCode(value.get()));
                }
                match self.phase {
                    Phase::From => {
                        self.from_key = Some(key);
                        self.phase = Phase::FromModifiers;
                    }
                    Phase::FromModifiers | Phase::ToEvents => {
                        self.current_mut().push(ToEvent {
                            key,
                            flags: Flags::empty(),
                        });
                        self.phase = Phase::ToEvents;
                    }
                }
            }

            AddDataType::ModifierFlag => {
                let flag = ModifierFlag::from_stream_value(value.get())
                    .ok_or(RuleBuildError::InvalidModifierFlag(value.get()))?;
                match self.phase {
                    Phase::From => return Err(Self::unexpected(tag, "key_code")),
                    Phase::FromModifiers => {
                        self.from_flags.insert(flag);
                        self.pure_flags = match self.from_key.and_then(KeyCode::modifier_flag) {
                            Some(own) => self.from_flags.without(own),
                            None => self.from_flags,
                        };
                    }
                    Phase::ToEvents => match self.current_mut().last_mut() {
                        Some(last) => last.flags.insert(flag),
                        None => {
                            return Err(RuleBuildError::NoEventForFlag {
                                rule: RemapType::KeyToKey,
                            })
                        }
                    },
                }
            }

            AddDataType::ModifierFlagsEnd => match self.phase {
                Phase::From => return Err(Self::unexpected(tag, "key_code")),
                Phase::FromModifiers => self.phase = Phase::ToEvents,
                Phase::ToEvents => {}
            },

            AddDataType::Option => {
                let option = KeyToKeyOption::from_repr(value.get())
                    .ok_or(RuleBuildError::InvalidOption(value.get()))?;
                match option {
                    KeyToKeyOption::NoRepeat => self.repeat_enabled = false,
                    KeyToKeyOption::BeforeKeyDown => self.current = Sequence::Before,
                    KeyToKeyOption::AfterKeyUp => self.current = Sequence::After,
                    KeyToKeyOption::ToKeys => self.current = Sequence::To,
                    KeyToKeyOption::IgnorePassThrough => self.ignore_pass_through = true,
                }
            }

            AddDataType::DelayUntilRepeat => self.delay_until_repeat = value.as_signed(),
            AddDataType::KeyRepeat => self.key_repeat = value.as_signed(),

            _ => return Err(Self::unexpected(tag, "key_to_key data")),
        }
        Ok(())
    }

    fn delay_until_repeat(&self, defaults: &RepeatDefaults) -> Duration {
        resolve_millis(self.delay_until_repeat, defaults.delay_until_repeat)
    }

    fn key_repeat(&self, defaults: &RepeatDefaults) -> Duration {
        resolve_millis(self.key_repeat, defaults.key_repeat)
    }

    /// Consume a matching event, writing replacements into `out`.
    ///
    /// `pressing` is this rule's runtime state, owned by the rule list.
    pub fn remap(
        &self,
        event: &KeyEvent,
        pressing: &mut bool,
        repeat_id: usize,
        defaults: &RepeatDefaults,
        out: &mut RemapOutput,
    ) -> bool {
        let Some(from_key) = self.from_key else {
            return false;
        };
        if event.key != from_key {
            return false;
        }

        let is_down = event.is_key_down();
        if is_down {
            if *pressing && event.repeat {
                return true;
            }
            if !event.flags.contains_all(self.pure_flags) {
                return false;
            }
        } else if !*pressing {
            return false;
        }

        let mut base = event.flags.difference(self.pure_flags);
        if let Some(own) = from_key.modifier_flag() {
            base.remove(own);
        }

        if is_down {
            *pressing = true;
            log::trace!("KeyToKey::remap press {} -> {} keys", from_key, self.to_keys.len());

            for to in &self.before_keys {
                emit(out, event, to, base, true);
                emit(out, event, to, base, false);
            }
            let count = self.to_keys.len();
            for (i, to) in self.to_keys.iter().enumerate() {
                emit(out, event, to, base, true);
                if i + 1 < count {
                    emit(out, event, to, base, false);
                }
            }

            if let Some(last) = self.to_keys.last() {
                if self.repeat_enabled && !last.key.is_modifier() {
                    out.repeat = Some(RepeatDirective::Start {
                        id: repeat_id,
                        event: to_key_event(event, last, base, true),
                        delay: self.delay_until_repeat(defaults),
                        interval: self.key_repeat(defaults),
                    });
                }
            }
        } else {
            *pressing = false;
            log::trace!("KeyToKey::remap release {}", from_key);

            if let Some(last) = self.to_keys.last() {
                emit(out, event, last, base, false);
            }
            for to in &self.after_keys {
                emit(out, event, to, base, true);
                emit(out, event, to, base, false);
            }
            out.repeat = Some(RepeatDirective::Cancel { id: repeat_id });
        }

        true
    }
}

impl Default for KeyToKey {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_millis(value: i32, default: Duration) -> Duration {
    if value < 0 {
        default
    } else {
        Duration::from_millis(value as u64)
    }
}

/// Build the output event for `to`.
///
/// Modifier keys become modify events with their own flag set while pressed.
fn to_key_event(source: &KeyEvent, to: &ToEvent, base: Flags, down: bool) -> KeyEvent {
    let mut flags = base.union(to.flags);
    let event_type = match to.key.modifier_flag() {
        Some(own) => {
            if down {
                flags.insert(own);
            } else {
                flags.remove(own);
            }
            EventType::Modify
        }
        None if down => EventType::Down,
        None => EventType::Up,
    };
    KeyEvent::new(event_type, to.key, flags).with_keyboard_type(source.keyboard_type)
}

fn emit(out: &mut RemapOutput, source: &KeyEvent, to: &ToEvent, base: Flags, down: bool) {
    out.events.push(to_key_event(source, to, base, down));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: &[(AddDataType, u32)]) -> KeyToKey {
        let mut rule = KeyToKey::new();
        for (tag, value) in pairs {
            rule.add(*tag, AddValue(*value)).unwrap();
        }
        rule
    }

    fn run(rule: &KeyToKey, event: KeyEvent, pressing: &mut bool) -> (bool, RemapOutput) {
        let mut out = RemapOutput::default();
        let consumed = rule.remap(&event, pressing, 3, &RepeatDefaults::default(), &mut out);
        (consumed, out)
    }

    #[test]
    fn test_build_phases() {
        let rule = build(&[
            (AddDataType::KeyCode, KeyCode::A.code()),
            (AddDataType::ModifierFlag, ModifierFlag::ShiftL.stream_value()),
            (AddDataType::ModifierFlagsEnd, 1),
            (AddDataType::KeyCode, KeyCode::B.code()),
            (AddDataType::ModifierFlag, ModifierFlag::CommandL.stream_value()),
        ]);
        assert_eq!(rule.from_key(), Some(KeyCode::A));
        assert_eq!(rule.from_flags(), Flags::from_flag(ModifierFlag::ShiftL));
        assert_eq!(
            rule.to_keys(),
            &[ToEvent {
                key: KeyCode::B,
                flags: Flags::from_flag(ModifierFlag::CommandL)
            }]
        );
    }

    #[test]
    fn test_modifier_before_from_key_rejected() {
        let mut rule = KeyToKey::new();
        assert!(matches!(
            rule.add(AddDataType::ModifierFlag, AddValue(1)),
            Err(RuleBuildError::UnexpectedData { .. })
        ));
        assert!(rule.from_key().is_none());
    }

    #[test]
    fn test_device_tags_rejected() {
        let mut rule = build(&[(AddDataType::KeyCode, KeyCode::A.code())]);
        assert!(rule.add(AddDataType::DeviceVendor, AddValue(1)).is_err());
        assert!(rule.add(AddDataType::KeyboardType, AddValue(40)).is_err());
    }

    #[test]
    fn test_option_switches_sequence_without_clearing() {
        let rule = build(&[
            (AddDataType::KeyCode, KeyCode::A.code()),
            (AddDataType::KeyCode, KeyCode::B.code()),
            (AddDataType::Option, KeyToKeyOption::BeforeKeyDown as u32),
            (AddDataType::KeyCode, KeyCode::C.code()),
            (AddDataType::Option, KeyToKeyOption::AfterKeyUp as u32),
            (AddDataType::KeyCode, KeyCode::D.code()),
            (AddDataType::Option, KeyToKeyOption::ToKeys as u32),
            (AddDataType::KeyCode, KeyCode::E.code()),
        ]);
        let keys = |seq: &[ToEvent]| seq.iter().map(|t| t.key).collect::<Vec<_>>();
        assert_eq!(keys(rule.to_keys()), vec![KeyCode::B, KeyCode::E]);
        assert_eq!(keys(rule.before_keys()), vec![KeyCode::C]);
        assert_eq!(keys(rule.after_keys()), vec![KeyCode::D]);
    }

    #[test]
    fn test_press_and_release() {
        let rule = build(&[
            (AddDataType::KeyCode, KeyCode::A.code()),
            (AddDataType::KeyCode, KeyCode::B.code()),
        ]);
        let mut pressing = false;

        let (consumed, out) = run(&rule, KeyEvent::down(KeyCode::A, Flags::empty()), &mut pressing);
        assert!(consumed);
        assert!(pressing);
        assert_eq!(out.events.as_slice(), &[KeyEvent::down(KeyCode::B, Flags::empty())]);
        assert!(matches!(out.repeat, Some(RepeatDirective::Start { id: 3, .. })));

        let (consumed, out) = run(&rule, KeyEvent::up(KeyCode::A, Flags::empty()), &mut pressing);
        assert!(consumed);
        assert!(!pressing);
        assert_eq!(out.events.as_slice(), &[KeyEvent::up(KeyCode::B, Flags::empty())]);
        assert_eq!(out.repeat, Some(RepeatDirective::Cancel { id: 3 }));
    }

    #[test]
    fn test_requires_from_modifiers() {
        let rule = build(&[
            (AddDataType::KeyCode, KeyCode::A.code()),
            (AddDataType::ModifierFlag, ModifierFlag::ControlL.stream_value()),
            (AddDataType::ModifierFlagsEnd, 1),
            (AddDataType::KeyCode, KeyCode::CURSOR_LEFT.code()),
        ]);
        let mut pressing = false;

        let (consumed, _) = run(&rule, KeyEvent::down(KeyCode::A, Flags::empty()), &mut pressing);
        assert!(!consumed);

        let held = Flags::from_flag(ModifierFlag::ControlL).with(ModifierFlag::ShiftL);
        let (consumed, out) = run(&rule, KeyEvent::down(KeyCode::A, held), &mut pressing);
        assert!(consumed);
        // Control is eaten by the rule, shift is passed on
        assert_eq!(
            out.events.as_slice(),
            &[KeyEvent::down(KeyCode::CURSOR_LEFT, Flags::from_flag(ModifierFlag::ShiftL))]
        );
    }

    #[test]
    fn test_release_without_press_passes_through() {
        let rule = build(&[
            (AddDataType::KeyCode, KeyCode::A.code()),
            (AddDataType::KeyCode, KeyCode::B.code()),
        ]);
        let mut pressing = false;
        let (consumed, out) = run(&rule, KeyEvent::up(KeyCode::A, Flags::empty()), &mut pressing);
        assert!(!consumed);
        assert!(out.events.is_empty());
    }

    #[test]
    fn test_hardware_repeat_consumed_silently() {
        let rule = build(&[
            (AddDataType::KeyCode, KeyCode::A.code()),
            (AddDataType::KeyCode, KeyCode::B.code()),
        ]);
        let mut pressing = false;
        run(&rule, KeyEvent::down(KeyCode::A, Flags::empty()), &mut pressing);

        let repeat = KeyEvent::down(KeyCode::A, Flags::empty()).with_repeat(true);
        let (consumed, out) = run(&rule, repeat, &mut pressing);
        assert!(consumed);
        assert!(out.events.is_empty());
        assert!(out.repeat.is_none());
    }

    #[test]
    fn test_sequence_with_before_and_after_keys() {
        let rule = build(&[
            (AddDataType::KeyCode, KeyCode::A.code()),
            (AddDataType::KeyCode, KeyCode::B.code()),
            (AddDataType::KeyCode, KeyCode::C.code()),
            (AddDataType::Option, KeyToKeyOption::BeforeKeyDown as u32),
            (AddDataType::KeyCode, KeyCode::ESCAPE.code()),
            (AddDataType::Option, KeyToKeyOption::AfterKeyUp as u32),
            (AddDataType::KeyCode, KeyCode::RETURN.code()),
        ]);
        let none = Flags::empty();
        let mut pressing = false;

        let (_, out) = run(&rule, KeyEvent::down(KeyCode::A, none), &mut pressing);
        assert_eq!(
            out.events.as_slice(),
            &[
                KeyEvent::down(KeyCode::ESCAPE, none),
                KeyEvent::up(KeyCode::ESCAPE, none),
                KeyEvent::down(KeyCode::B, none),
                KeyEvent::up(KeyCode::B, none),
                KeyEvent::down(KeyCode::C, none),
            ]
        );

        let (_, out) = run(&rule, KeyEvent::up(KeyCode::A, none), &mut pressing);
        assert_eq!(
            out.events.as_slice(),
            &[
                KeyEvent::up(KeyCode::C, none),
                KeyEvent::down(KeyCode::RETURN, none),
                KeyEvent::up(KeyCode::RETURN, none),
            ]
        );
    }

    #[test]
    fn test_modifier_to_key_is_modify_event() {
        let rule = build(&[
            (AddDataType::KeyCode, KeyCode::CAPSLOCK.code()),
            (AddDataType::KeyCode, KeyCode::CONTROL_L.code()),
        ]);
        let mut pressing = false;
        let caps = Flags::from_flag(ModifierFlag::CapsLock);

        let (consumed, out) = run(&rule, KeyEvent::modify(KeyCode::CAPSLOCK, caps), &mut pressing);
        assert!(consumed);
        assert_eq!(
            out.events.as_slice(),
            &[KeyEvent::modify(KeyCode::CONTROL_L, Flags::from_flag(ModifierFlag::ControlL))]
        );
        // No repeat for modifiers
        assert!(out.repeat.is_none());

        let (consumed, out) = run(
            &rule,
            KeyEvent::modify(KeyCode::CAPSLOCK, Flags::empty()),
            &mut pressing,
        );
        assert!(consumed);
        assert_eq!(
            out.events.as_slice(),
            &[KeyEvent::modify(KeyCode::CONTROL_L, Flags::empty())]
        );
    }

    #[test]
    fn test_no_repeat_and_custom_timing() {
        let no_repeat = build(&[
            (AddDataType::KeyCode, KeyCode::A.code()),
            (AddDataType::KeyCode, KeyCode::B.code()),
            (AddDataType::Option, KeyToKeyOption::NoRepeat as u32),
        ]);
        let mut pressing = false;
        let (_, out) = run(&no_repeat, KeyEvent::down(KeyCode::A, Flags::empty()), &mut pressing);
        assert!(out.repeat.is_none());

        let timed = build(&[
            (AddDataType::KeyCode, KeyCode::A.code()),
            (AddDataType::KeyCode, KeyCode::B.code()),
            (AddDataType::DelayUntilRepeat, 200),
            (AddDataType::KeyRepeat, u32::MAX),
        ]);
        let mut pressing = false;
        let (_, out) = run(&timed, KeyEvent::down(KeyCode::A, Flags::empty()), &mut pressing);
        match out.repeat {
            Some(RepeatDirective::Start { delay, interval, .. }) => {
                assert_eq!(delay, Duration::from_millis(200));
                assert_eq!(interval, Duration::from_millis(83));
            }
            other => panic!("expected repeat start, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_to_sequence_consumes() {
        let rule = build(&[(AddDataType::KeyCode, KeyCode::A.code())]);
        let mut pressing = false;
        let (consumed, out) = run(&rule, KeyEvent::down(KeyCode::A, Flags::empty()), &mut pressing);
        assert!(consumed);
        assert!(out.events.is_empty());
        assert!(out.repeat.is_none());
    }
}
