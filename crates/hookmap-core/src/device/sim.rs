// Hookmap Simulated Keyboard
// In-memory keyboard driver object implementing the registry capabilities

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::event::{KeyEvent, Timestamp};
use crate::hook::slot::{KeyboardEventFn, SlotBinding, UpdateFlagsFn};
use crate::Flags;

use super::capability::{EventSlots, HookableKeyboard};
use super::identity::{DeviceId, DeviceIdentifier, DeviceType};

/// Slot storage of a simulated driver object
#[derive(Default)]
struct SimulatedSlots {
    keyboard_event: Mutex<SlotBinding<KeyboardEventFn>>,
    update_flags: Mutex<SlotBinding<UpdateFlagsFn>>,
}

impl EventSlots for SimulatedSlots {
    fn keyboard_event(&self) -> SlotBinding<KeyboardEventFn> {
        self.keyboard_event.lock().clone()
    }

    fn set_keyboard_event(&self, binding: SlotBinding<KeyboardEventFn>) {
        *self.keyboard_event.lock() = binding;
    }

    fn update_flags(&self) -> SlotBinding<UpdateFlagsFn> {
        self.update_flags.lock().clone()
    }

    fn set_update_flags(&self, binding: SlotBinding<UpdateFlagsFn>) {
        *self.update_flags.lock() = binding;
    }
}

/// A keyboard that lives entirely in memory.
///
/// Used by the integration tests and the CLI replay mode. It behaves like a
/// driver object: slots can be rewritten behind the engine's back, events are
/// dispatched through whatever callback currently sits in a slot, and lock
/// indicator writes are counted.
pub struct SimulatedKeyboard {
    id: DeviceId,
    name: Option<String>,
    identifier: DeviceIdentifier,
    device_type: DeviceType,
    slots: Option<SimulatedSlots>,
    alpha_lock: AtomicBool,
    num_lock: AtomicBool,
    alpha_lock_writes: AtomicUsize,
    num_lock_writes: AtomicUsize,
}

impl SimulatedKeyboard {
    /// Default driver name reported by simulated keyboards
    pub const DEFAULT_NAME: &'static str = "IOHIDKeyboard";

    /// Create a keyboard with empty slots
    pub fn new(id: DeviceId, identifier: DeviceIdentifier, device_type: DeviceType) -> Self {
        Self {
            id,
            name: Some(Self::DEFAULT_NAME.to_string()),
            identifier,
            device_type,
            slots: Some(SimulatedSlots::default()),
            alpha_lock: AtomicBool::new(false),
            num_lock: AtomicBool::new(false),
            alpha_lock_writes: AtomicUsize::new(0),
            num_lock_writes: AtomicUsize::new(0),
        }
    }

    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(|n| n.to_string());
        self
    }

    /// Drop the slots, as for a device that is not a keyboard driver
    pub fn without_event_slots(mut self) -> Self {
        self.slots = None;
        self
    }

    pub fn with_keyboard_event(self, binding: SlotBinding<KeyboardEventFn>) -> Self {
        self.displace_keyboard_event(binding);
        self
    }

    pub fn with_update_flags(self, binding: SlotBinding<UpdateFlagsFn>) -> Self {
        self.displace_update_flags(binding);
        self
    }

    pub fn with_num_lock(self, on: bool) -> Self {
        self.num_lock.store(on, Ordering::SeqCst);
        self
    }

    pub fn with_alpha_lock(self, on: bool) -> Self {
        self.alpha_lock.store(on, Ordering::SeqCst);
        self
    }

    /// Current content of the keyboard event slot
    pub fn keyboard_event_binding(&self) -> SlotBinding<KeyboardEventFn> {
        self.slots
            .as_ref()
            .map(|s| s.keyboard_event())
            .unwrap_or_default()
    }

    /// Current content of the update flags slot
    pub fn update_flags_binding(&self) -> SlotBinding<UpdateFlagsFn> {
        self.slots
            .as_ref()
            .map(|s| s.update_flags())
            .unwrap_or_default()
    }

    /// Overwrite the keyboard event slot the way a vendor driver would
    pub fn displace_keyboard_event(&self, binding: SlotBinding<KeyboardEventFn>) {
        if let Some(slots) = &self.slots {
            slots.set_keyboard_event(binding);
        }
    }

    /// Overwrite the update flags slot the way a vendor driver would
    pub fn displace_update_flags(&self, binding: SlotBinding<UpdateFlagsFn>) {
        if let Some(slots) = &self.slots {
            slots.set_update_flags(binding);
        }
    }

    /// Deliver a key event through the keyboard event slot.
    ///
    /// Returns false when the slot is empty.
    pub fn dispatch_key(&self, event: &KeyEvent, ts: Timestamp) -> bool {
        let binding = self.keyboard_event_binding();
        match (binding.action, binding.target) {
            (Some(action), Some(target)) => {
                action(&target, event, ts, self.id);
                true
            }
            _ => false,
        }
    }

    /// Deliver a flag update through the update flags slot.
    ///
    /// Returns false when the slot is empty.
    pub fn dispatch_flags(&self, flags: Flags) -> bool {
        let binding = self.update_flags_binding();
        match (binding.action, binding.target) {
            (Some(action), Some(target)) => {
                action(&target, flags, self.id);
                true
            }
            _ => false,
        }
    }

    /// Number of caps lock indicator writes so far
    pub fn alpha_lock_writes(&self) -> usize {
        self.alpha_lock_writes.load(Ordering::SeqCst)
    }

    /// Number of num lock writes so far
    pub fn num_lock_writes(&self) -> usize {
        self.num_lock_writes.load(Ordering::SeqCst)
    }
}

impl HookableKeyboard for SimulatedKeyboard {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn identifier(&self) -> DeviceIdentifier {
        self.identifier
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn event_slots(&self) -> Option<&dyn EventSlots> {
        self.slots.as_ref().map(|s| s as &dyn EventSlots)
    }

    fn alpha_lock(&self) -> bool {
        self.alpha_lock.load(Ordering::SeqCst)
    }

    fn set_alpha_lock(&self, on: bool) {
        self.alpha_lock_writes.fetch_add(1, Ordering::SeqCst);
        self.alpha_lock.store(on, Ordering::SeqCst);
    }

    fn num_lock(&self) -> bool {
        self.num_lock.load(Ordering::SeqCst)
    }

    fn set_num_lock(&self, on: bool) {
        self.num_lock_writes.fetch_add(1, Ordering::SeqCst);
        self.num_lock.store(on, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::slot::{KeyboardEventCallback, Target};
    use crate::KeyCode;
    use std::sync::Arc;

    fn keyboard() -> SimulatedKeyboard {
        SimulatedKeyboard::new(
            DeviceId(1),
            DeviceIdentifier::new(0x05ac, 0x0262, 1),
            DeviceType::AppleInternal,
        )
    }

    #[test]
    fn test_dispatch_through_slot() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let callback = KeyboardEventCallback::new(move |target, _, _, sender| {
            assert_eq!(*target, Target(9));
            assert_eq!(sender, DeviceId(1));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let kbd = keyboard().with_keyboard_event(SlotBinding::new(callback, Target(9)));

        assert!(kbd.dispatch_key(&KeyEvent::down(KeyCode::A, Flags::empty()), Timestamp(0)));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_with_empty_slot() {
        let kbd = keyboard();
        assert!(!kbd.dispatch_key(&KeyEvent::down(KeyCode::A, Flags::empty()), Timestamp(0)));
        assert!(!kbd.dispatch_flags(Flags::empty()));
    }

    #[test]
    fn test_lock_writes_are_counted() {
        let kbd = keyboard().with_num_lock(true);
        assert!(kbd.num_lock());
        assert_eq!(kbd.num_lock_writes(), 0);
        kbd.set_num_lock(false);
        kbd.set_alpha_lock(true);
        assert_eq!(kbd.num_lock_writes(), 1);
        assert_eq!(kbd.alpha_lock_writes(), 1);
        assert!(kbd.alpha_lock());
    }

    #[test]
    fn test_without_slots() {
        let kbd = keyboard().without_event_slots();
        assert!(kbd.event_slots().is_none());
        assert!(kbd.keyboard_event_binding().action.is_none());
    }
}
