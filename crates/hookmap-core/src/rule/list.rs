// Hookmap Rule List
// The configured rules in evaluation order plus their runtime state

use crate::device::DeviceIdentifier;
use crate::event::{KeyEvent, KeyboardType};
use crate::Flags;

use super::stream::RuleRecord;
use super::{RemapOutput, RemapRule, RepeatDefaults};

/// Every configured rule, in configuration order.
///
/// Rebuilt wholesale on each configuration change. The per-rule pressing
/// flags are the only state that changes while events flow.
///
/// In pass-through mode only rules marked `ignore_pass_through` take part in
/// evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleList {
    rules: Vec<RemapRule>,
    pressing: Vec<bool>,
    pass_through: bool,
}

impl RuleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build rules from records, replaying each pair through `add`.
    ///
    /// A rejected pair is logged and skipped; the rule keeps whatever it had
    /// accepted so far.
    pub fn build(records: &[RuleRecord]) -> Self {
        let mut list = Self::new();
        for (index, record) in records.iter().enumerate() {
            let mut rule = RemapRule::new(record.remap_type);
            for pair in &record.values {
                if let Err(e) = rule.add(pair.tag, pair.value) {
                    log::error!(
                        "RuleList::build rule #{} ignoring {}={}: {}",
                        index,
                        pair.tag,
                        pair.value,
                        e
                    );
                }
            }
            list.push(rule);
        }
        log::debug!("RuleList::build {} rules", list.len());
        list
    }

    pub fn push(&mut self, rule: RemapRule) {
        self.rules.push(rule);
        self.pressing.push(false);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[RemapRule] {
        &self.rules
    }

    pub fn set_pass_through(&mut self, on: bool) {
        self.pass_through = on;
    }

    pub fn is_pass_through(&self) -> bool {
        self.pass_through
    }

    fn is_active(&self, rule: &RemapRule) -> bool {
        !self.pass_through || rule.ignore_pass_through()
    }

    fn active(&self) -> impl Iterator<Item = &RemapRule> {
        self.rules.iter().filter(|rule| self.is_active(rule))
    }

    /// Any rule discards `event` on the forwarding path
    pub fn drop_key_after_remap(&self, event: &KeyEvent) -> bool {
        self.active().any(|rule| rule.drop(event))
    }

    /// Run the remap rules over `event`.
    ///
    /// The first consuming rule wins. `None` means nothing consumed the event
    /// and it passes through unchanged. The repeat id handed to a rule is its
    /// index.
    pub fn remap(&mut self, event: &KeyEvent, defaults: &RepeatDefaults) -> Option<RemapOutput> {
        let mut out = RemapOutput::default();
        let pass_through = self.pass_through;
        for (index, (rule, pressing)) in self.rules.iter().zip(self.pressing.iter_mut()).enumerate() {
            if pass_through && !rule.ignore_pass_through() {
                continue;
            }
            if rule.remap(event, pressing, index, defaults, &mut out) {
                log::trace!("RuleList::remap rule #{} consumed {}", index, event);
                return Some(out);
            }
        }
        None
    }

    /// Rewrite `keyboard_type` with the first matching rule
    pub fn remap_set_keyboard_type(&self, keyboard_type: &mut KeyboardType, flags: Flags) -> bool {
        self.active()
            .any(|rule| rule.remap_set_keyboard_type(keyboard_type, flags))
    }

    /// Any rule asks for num lock to be forced on for this device
    pub fn remap_force_num_lock_on(&self, identifier: &DeviceIdentifier) -> bool {
        self.active()
            .any(|rule| rule.remap_force_num_lock_on(identifier))
    }

    pub fn remap_simultaneous_key_presses(&self) -> bool {
        self.active()
            .any(|rule| rule.remap_simultaneous_key_presses())
    }

    pub fn block_until_key_up_event(&self) -> Option<&KeyEvent> {
        self.active()
            .find_map(|rule| rule.block_until_key_up_event())
    }
}
