// Hookmap Hooked Keyboard List
// Insertion-ordered registry of attached keyboards

use std::sync::Arc;

use indexmap::IndexMap;

use crate::device::{DeviceId, HookableKeyboard};
use crate::policy::Policy;

use super::entry::{HookedKeyboard, OwnCallbacks};

/// Every attached keyboard, keyed by registry id
#[derive(Debug, Default)]
pub struct HookedKeyboardList {
    entries: IndexMap<DeviceId, HookedKeyboard>,
}

impl HookedKeyboardList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry for `device` and evaluate it against `policy`.
    ///
    /// An existing entry with the same id is dropped first, which restores
    /// its slots.
    pub fn attach(
        &mut self,
        device: Arc<dyn HookableKeyboard>,
        own: OwnCallbacks,
        policy: &Policy,
    ) -> bool {
        let id = device.id();
        if self.entries.shift_remove(&id).is_some() {
            log::debug!("HookedKeyboardList::attach replacing {}", id);
        }
        let mut entry = HookedKeyboard::new(device, own);
        let written = entry.refresh(policy);
        self.entries.insert(id, entry);
        written
    }

    /// Remove and drop the entry for `id`
    pub fn detach(&mut self, id: DeviceId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    pub fn get(&self, id: DeviceId) -> Option<&HookedKeyboard> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: DeviceId) -> Option<&mut HookedKeyboard> {
        self.entries.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HookedKeyboard> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-evaluate every entry, returning how many had a slot written
    pub fn refresh_all(&mut self, policy: &Policy) -> usize {
        self.entries
            .values_mut()
            .map(|entry| entry.refresh(policy))
            .filter(|written| *written)
            .count()
    }

    /// Drop every entry, restoring their slots
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{vendor, DeviceIdentifier, DeviceType, SimulatedKeyboard};
    use crate::hook::slot::{KeyboardEventCallback, SlotBinding, Target, UpdateFlagsCallback};
    use crate::policy::PolicyToggle;

    fn own_callbacks() -> OwnCallbacks {
        OwnCallbacks {
            keyboard_event: KeyboardEventCallback::new(|_, _, _, _| {}),
            update_flags: UpdateFlagsCallback::new(|_, _, _| {}),
        }
    }

    fn keyboard(id: u64, device_type: DeviceType) -> Arc<SimulatedKeyboard> {
        Arc::new(
            SimulatedKeyboard::new(
                DeviceId(id),
                DeviceIdentifier::new(vendor::APPLE_COMPUTER, 0x0250, id as u32),
                device_type,
            )
            .with_keyboard_event(SlotBinding::new(
                KeyboardEventCallback::new(|_, _, _, _| {}),
                Target(id),
            ))
            .with_update_flags(SlotBinding::new(
                UpdateFlagsCallback::new(|_, _, _| {}),
                Target(id),
            )),
        )
    }

    #[test]
    fn test_attach_and_detach() {
        let own = own_callbacks();
        let policy = Policy::loaded_defaults();
        let mut list = HookedKeyboardList::new();
        let device = keyboard(1, DeviceType::AppleInternal);
        let before = device.keyboard_event_binding();

        assert!(list.attach(device.clone(), own.clone(), &policy));
        assert_eq!(list.len(), 1);
        assert!(device.keyboard_event_binding().holds(&own.keyboard_event));

        assert!(list.detach(DeviceId(1)));
        assert!(list.is_empty());
        assert!(device.keyboard_event_binding().same(&before));
        assert!(!list.detach(DeviceId(1)));
    }

    #[test]
    fn test_refresh_all_follows_policy() {
        let own = own_callbacks();
        let mut list = HookedKeyboardList::new();
        let internal = keyboard(1, DeviceType::AppleInternal);
        let external = keyboard(2, DeviceType::AppleExternal);
        list.attach(internal.clone(), own.clone(), &Policy::loaded_defaults());
        list.attach(external.clone(), own.clone(), &Policy::loaded_defaults());

        let policy = Policy::loaded_defaults().with(PolicyToggle::DontRemapExternal, true);
        assert_eq!(list.refresh_all(&policy), 1);
        assert!(list.get(DeviceId(1)).unwrap().is_replaced());
        assert!(!list.get(DeviceId(2)).unwrap().is_replaced());
        assert!(!external.keyboard_event_binding().holds(&own.keyboard_event));
    }

    #[test]
    fn test_iteration_keeps_attach_order() {
        let own = own_callbacks();
        let policy = Policy::loaded_defaults();
        let mut list = HookedKeyboardList::new();
        for id in [3, 1, 2] {
            list.attach(keyboard(id, DeviceType::AppleExternal), own.clone(), &policy);
        }
        let ids: Vec<_> = list.iter().map(|entry| entry.id().0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_clear_restores_everything() {
        let own = own_callbacks();
        let mut list = HookedKeyboardList::new();
        let device = keyboard(1, DeviceType::AppleInternal);
        let before = device.update_flags_binding();
        list.attach(device.clone(), own, &Policy::loaded_defaults());

        list.clear();
        assert!(device.update_flags_binding().same(&before));
    }
}
