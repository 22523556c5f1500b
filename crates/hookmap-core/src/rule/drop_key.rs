// Hookmap Drop Key Rule
// Discards a key on the forwarding path after all remapping has happened

use crate::event::KeyEvent;
use crate::{Flags, KeyCode, ModifierFlag};

use super::stream::{AddDataType, AddValue, RemapType};
use super::RuleBuildError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropKeyAfterRemap {
    key: Option<KeyCode>,
    flags: Flags,
    pub(super) ignore_pass_through: bool,
}

impl DropKeyAfterRemap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tag: AddDataType, value: AddValue) -> Result<(), RuleBuildError> {
        match (tag, self.key) {
            (AddDataType::KeyCode, None) => {
                let key = KeyCode(value.get());
                if !key.is_valid() {
                    return Err(RuleBuildError::InvalidKeyCode(value.get()));
                }
                self.key = Some(key);
            }
            (AddDataType::ModifierFlag, Some(_)) => {
                let flag = ModifierFlag::from_stream_value(value.get())
                    .ok_or(RuleBuildError::InvalidModifierFlag(value.get()))?;
                self.flags.insert(flag);
            }
            (AddDataType::ModifierFlagsEnd, Some(_)) => {}
            (tag, key) => {
                return Err(RuleBuildError::UnexpectedData {
                    rule: RemapType::DropKeyAfterRemap,
                    tag,
                    expected: if key.is_none() {
                        "key_code"
                    } else {
                        "modifier_flag"
                    },
                })
            }
        }
        Ok(())
    }

    pub fn drop(&self, event: &KeyEvent) -> bool {
        self.key == Some(event.key) && event.flags.contains_all(self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_with_modifiers() {
        let mut rule = DropKeyAfterRemap::new();
        rule.add(AddDataType::KeyCode, AddValue(KeyCode::Q.code())).unwrap();
        rule.add(
            AddDataType::ModifierFlag,
            AddValue(ModifierFlag::CommandL.stream_value()),
        )
        .unwrap();

        let command = Flags::from_flag(ModifierFlag::CommandL);
        assert!(rule.drop(&KeyEvent::down(KeyCode::Q, command)));
        assert!(rule.drop(&KeyEvent::up(KeyCode::Q, command.with(ModifierFlag::ShiftL))));
        assert!(!rule.drop(&KeyEvent::down(KeyCode::Q, Flags::empty())));
        assert!(!rule.drop(&KeyEvent::down(KeyCode::W, command)));
    }

    #[test]
    fn test_flag_before_key_rejected() {
        let mut rule = DropKeyAfterRemap::new();
        assert!(rule.add(AddDataType::ModifierFlag, AddValue(1)).is_err());
        assert!(!rule.drop(&KeyEvent::down(KeyCode::A, Flags::empty())));
    }

    #[test]
    fn test_second_key_rejected() {
        let mut rule = DropKeyAfterRemap::new();
        rule.add(AddDataType::KeyCode, AddValue(KeyCode::A.code())).unwrap();
        assert!(rule.add(AddDataType::KeyCode, AddValue(KeyCode::B.code())).is_err());
        assert!(rule.drop(&KeyEvent::down(KeyCode::A, Flags::empty())));
    }
}
