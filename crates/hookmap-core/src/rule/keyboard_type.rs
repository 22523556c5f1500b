// Hookmap Keyboard Type Rule
// Rewrites the reported keyboard type while given modifiers are held

use crate::event::KeyboardType;
use crate::{Flags, ModifierFlag};

use super::stream::{AddDataType, AddValue, RemapType};
use super::RuleBuildError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetKeyboardType {
    keyboard_type: Option<KeyboardType>,
    flags: Flags,
    pub(super) ignore_pass_through: bool,
}

impl SetKeyboardType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tag: AddDataType, value: AddValue) -> Result<(), RuleBuildError> {
        match (tag, self.keyboard_type) {
            (AddDataType::KeyboardType, None) => {
                self.keyboard_type = Some(KeyboardType(value.get()));
            }
            (AddDataType::ModifierFlag, Some(_)) => {
                let flag = ModifierFlag::from_stream_value(value.get())
                    .ok_or(RuleBuildError::InvalidModifierFlag(value.get()))?;
                self.flags.insert(flag);
            }
            (AddDataType::ModifierFlagsEnd, Some(_)) => {}
            (tag, keyboard_type) => {
                return Err(RuleBuildError::UnexpectedData {
                    rule: RemapType::SetKeyboardType,
                    tag,
                    expected: if keyboard_type.is_none() {
                        "keyboard_type"
                    } else {
                        "modifier_flag"
                    },
                })
            }
        }
        Ok(())
    }

    pub fn remap_set_keyboard_type(&self, keyboard_type: &mut KeyboardType, flags: Flags) -> bool {
        match self.keyboard_type {
            Some(to) if flags.contains_all(self.flags) => {
                *keyboard_type = to;
                true
            }
            _ => false,
        }
    }
}
