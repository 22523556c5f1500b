// Hookmap Rule Stream
// Tagged (data type, value) pairs that configure remap rules, and their word codec

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, FromRepr};

/// Tag of one configuration value
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, FromRepr, Serialize, Deserialize,
)]
#[repr(u32)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AddDataType {
    KeyCode = 1,
    ModifierFlag = 2,
    ModifierFlagsEnd = 3,
    Option = 4,
    KeyboardType = 5,
    DeviceVendor = 6,
    DeviceProduct = 7,
    DeviceLocation = 8,
    DelayUntilRepeat = 9,
    KeyRepeat = 10,
}

/// Raw configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddValue(pub u32);

impl AddValue {
    pub fn get(self) -> u32 {
        self.0
    }

    /// The value reinterpreted as signed, for millisecond settings where -1
    /// means unset
    pub fn as_signed(self) -> i32 {
        self.0 as i32
    }
}

impl From<u32> for AddValue {
    fn from(value: u32) -> Self {
        AddValue(value)
    }
}

impl fmt::Display for AddValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which rule variant a record configures
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, FromRepr, Serialize, Deserialize,
)]
#[repr(u32)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RemapType {
    KeyToKey = 1,
    ForceNumLockOn = 2,
    DropKeyAfterRemap = 3,
    SetKeyboardType = 4,
}

/// One (tag, value) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePair {
    pub tag: AddDataType,
    pub value: AddValue,
}

impl RulePair {
    pub fn new(tag: AddDataType, value: impl Into<AddValue>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }
}

/// Everything needed to build one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub remap_type: RemapType,
    #[serde(default)]
    pub values: Vec<RulePair>,
}

impl RuleRecord {
    pub fn new(remap_type: RemapType) -> Self {
        Self {
            remap_type,
            values: Vec::new(),
        }
    }

    /// Builder-style pair append
    pub fn with(mut self, tag: AddDataType, value: impl Into<AddValue>) -> Self {
        self.values.push(RulePair::new(tag, value));
        self
    }
}

/// Framing and parsing failures of a rule stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("Record at word {offset} needs {needed} words, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Record at word {offset} has zero length")]
    ZeroLength { offset: usize },

    #[error("Record at word {offset} has an odd number of pair words ({words})")]
    OddPairCount { offset: usize, words: usize },

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Unknown {tag} name: {name}")]
    UnknownName { tag: AddDataType, name: String },

    #[error("Value {value} out of range for {tag}")]
    OutOfRange { tag: AddDataType, value: i64 },
}

/// Decode a word stream of `[len, remap_type, (tag, value)*]` records.
///
/// Records with an unknown remap type and pairs with an unknown tag are
/// skipped with a warning. Framing errors abort the decode.
pub fn decode_words(words: &[u32]) -> Result<Vec<RuleRecord>, StreamError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < words.len() {
        let len = words[offset] as usize;
        if len == 0 {
            return Err(StreamError::ZeroLength { offset });
        }
        let available = words.len() - offset - 1;
        if len > available {
            return Err(StreamError::Truncated {
                offset,
                needed: len,
                available,
            });
        }
        let body = &words[offset + 1..offset + 1 + len];
        let pair_words = &body[1..];
        if pair_words.len() % 2 != 0 {
            return Err(StreamError::OddPairCount {
                offset,
                words: pair_words.len(),
            });
        }

        match RemapType::from_repr(body[0]) {
            Some(remap_type) => {
                let mut record = RuleRecord::new(remap_type);
                for pair in pair_words.chunks_exact(2) {
                    match AddDataType::from_repr(pair[0]) {
                        Some(tag) => record.values.push(RulePair::new(tag, pair[1])),
                        None => log::warn!(
                            "decode_words: skipping unknown data type {} in record at word {}",
                            pair[0],
                            offset
                        ),
                    }
                }
                records.push(record);
            }
            None => log::warn!(
                "decode_words: skipping record at word {} with unknown remap type {}",
                offset,
                body[0]
            ),
        }

        offset += len + 1;
    }

    Ok(records)
}

/// Encode records into the word stream read by [`decode_words`]
pub fn encode_words(records: &[RuleRecord]) -> Vec<u32> {
    let mut words = Vec::new();
    for record in records {
        words.push(1 + 2 * record.values.len() as u32);
        words.push(record.remap_type as u32);
        for pair in &record.values {
            words.push(pair.tag as u32);
            words.push(pair.value.get());
        }
    }
    words
}

#[cfg(feature = "config-file")]
mod toml_file {
    use super::*;
    use crate::rule::KeyToKeyOption;
    use crate::{KeyCode, ModifierFlag};

    #[derive(Debug, Deserialize)]
    struct RuleFileToml {
        #[serde(default)]
        rule: Vec<RuleToml>,
    }

    #[derive(Debug, Deserialize)]
    struct RuleToml {
        remap_type: RemapType,
        #[serde(default)]
        values: Vec<PairToml>,
    }

    #[derive(Debug, Deserialize)]
    struct PairToml {
        tag: AddDataType,
        value: ValueToml,
    }

    #[derive(Debug, Deserialize)]
    #[serde(untagged)]
    enum ValueToml {
        Number(i64),
        Name(String),
    }

    fn resolve(tag: AddDataType, value: ValueToml) -> Result<AddValue, StreamError> {
        match value {
            ValueToml::Number(n) => {
                // Negative millisecond settings travel as their two's complement
                if (i32::MIN as i64..=u32::MAX as i64).contains(&n) {
                    Ok(AddValue(n as u32))
                } else {
                    Err(StreamError::OutOfRange { tag, value: n })
                }
            }
            ValueToml::Name(name) => {
                let resolved = match tag {
                    AddDataType::KeyCode => name.parse::<KeyCode>().ok().map(|k| k.code()),
                    AddDataType::ModifierFlag => name
                        .parse::<ModifierFlag>()
                        .ok()
                        .map(|flag| flag.stream_value()),
                    AddDataType::Option => name
                        .parse::<KeyToKeyOption>()
                        .ok()
                        .map(|option| option as u32),
                    _ => None,
                };
                resolved
                    .map(AddValue)
                    .ok_or(StreamError::UnknownName { tag, name })
            }
        }
    }

    /// Parse a TOML rule file of `[[rule]]` tables.
    ///
    /// Values are integers, or names for key codes, modifier flags and
    /// options.
    pub fn records_from_toml(content: &str) -> Result<Vec<RuleRecord>, StreamError> {
        let parsed: RuleFileToml =
            toml::from_str(content).map_err(|e| StreamError::TomlParse(e.to_string()))?;

        parsed
            .rule
            .into_iter()
            .map(|rule| {
                let mut record = RuleRecord::new(rule.remap_type);
                for pair in rule.values {
                    let value = resolve(pair.tag, pair.value)?;
                    record.values.push(RulePair { tag: pair.tag, value });
                }
                Ok(record)
            })
            .collect()
    }
}

#[cfg(feature = "config-file")]
pub use toml_file::records_from_toml;
