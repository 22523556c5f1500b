// Hookmap Device Capabilities
// The narrow interface a device registry exposes for a keyboard driver object

use crate::hook::slot::{KeyboardEventFn, SlotBinding, UpdateFlagsFn};

use super::identity::{DeviceId, DeviceIdentifier, DeviceType};

/// The two hookable callback slots of a keyboard driver object.
///
/// Implementations read and write the driver's own slot storage. The engine
/// borrows whatever it reads and never frees it.
pub trait EventSlots: Send + Sync {
    fn keyboard_event(&self) -> SlotBinding<KeyboardEventFn>;
    fn set_keyboard_event(&self, binding: SlotBinding<KeyboardEventFn>);

    fn update_flags(&self) -> SlotBinding<UpdateFlagsFn>;
    fn set_update_flags(&self, binding: SlotBinding<UpdateFlagsFn>);
}

/// A device offered by the registry.
///
/// Lock indicator accessors talk to hardware and are always called with the
/// engine lock released.
pub trait HookableKeyboard: Send + Sync {
    fn id(&self) -> DeviceId;

    /// Driver name, if the driver reports one
    fn name(&self) -> Option<String>;

    fn identifier(&self) -> DeviceIdentifier;

    fn device_type(&self) -> DeviceType;

    /// The callback slots, or `None` when the device is not a keyboard driver
    fn event_slots(&self) -> Option<&dyn EventSlots>;

    /// Caps lock indicator state
    fn alpha_lock(&self) -> bool;
    fn set_alpha_lock(&self, on: bool);

    /// Num lock state
    fn num_lock(&self) -> bool;
    fn set_num_lock(&self, on: bool);
}

/// Write `desired` through `write` only when it differs from `current`.
///
/// Returns whether a write happened.
pub fn sync_toggle(current: bool, desired: bool, write: impl FnOnce(bool)) -> bool {
    if current == desired {
        return false;
    }
    write(desired);
    true
}
