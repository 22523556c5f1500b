// Hookmap Hooked Keyboard
// Per-device hook state: evaluation, installation and restoration of slots

use std::fmt;
use std::sync::Arc;

use strum_macros::Display;

use crate::device::{is_consumer, product, vendor, DeviceId, DeviceType, HookableKeyboard};
use crate::policy::{Policy, PolicyToggle};

use super::slot::{
    Callback, KeyboardEventCallback, KeyboardEventFn, SlotBinding, Target, UpdateFlagsCallback,
    UpdateFlagsFn,
};

/// The engine's own callbacks, written into hooked slots
#[derive(Clone, Debug)]
pub struct OwnCallbacks {
    pub keyboard_event: KeyboardEventCallback,
    pub update_flags: UpdateFlagsCallback,
}

/// State of one hookable slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SlotState {
    /// Never hooked, or restore found a third party in the slot
    Uninstalled,
    /// The slot was empty; nothing captured yet, retried on the next pass
    InstallPending,
    /// Original captured and the engine's callback written
    Installed,
    /// The captured original was written back
    Restored,
}

/// Why a device is not hooked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ExclusionReason {
    NoEventSlots,
    NoName,
    ConsumerDevice,
    PolicyNotInitialized,
    AutoEnableOff,
    ThirdVendorKeyboard,
    InternalKeyboard,
    ExternalKeyboard,
    AppleKeyboard,
    NonAppleKeyboard,
    LogitechUsbHeadset,
    PseudoIdentity,
}

/// Outcome of evaluating a device against the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    Install,
    Restore(ExclusionReason),
}

/// Snapshot of an entry's hook state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookStatus {
    pub keyboard_event: SlotState,
    pub update_flags: SlotState,
    pub in_progress: bool,
    pub replaced: bool,
}

/// One hookable slot with its captured original
struct HookSlot<F: ?Sized> {
    state: SlotState,
    original: Option<SlotBinding<F>>,
}

impl<F: ?Sized> HookSlot<F> {
    fn new() -> Self {
        Self {
            state: SlotState::Uninstalled,
            original: None,
        }
    }

    /// Take over the slot unless it is empty or already ours.
    ///
    /// Capture happens only when the slot holds something other than our
    /// callback, so repeated passes never overwrite a captured original with
    /// our own pointer.
    fn install(
        &mut self,
        current: SlotBinding<F>,
        own: &Callback<F>,
        write: impl FnOnce(SlotBinding<F>),
    ) -> bool {
        match &current.action {
            None => {
                self.state = SlotState::InstallPending;
                false
            }
            Some(action) if action.same(own) => false,
            Some(_) => {
                let target = current.target;
                self.original = Some(current);
                write(SlotBinding {
                    action: Some(own.clone()),
                    target,
                });
                self.state = SlotState::Installed;
                true
            }
        }
    }

    /// Write the original back if the slot still holds our callback.
    ///
    /// A third party in the slot is left alone. The captured original is
    /// cleared either way.
    fn restore(
        &mut self,
        current: Option<SlotBinding<F>>,
        own: &Callback<F>,
        write: impl FnOnce(SlotBinding<F>),
    ) -> bool {
        let original = self.original.take();
        let restored = match current {
            Some(current) if current.holds(own) => {
                write(original.unwrap_or_default());
                true
            }
            _ => false,
        };
        self.state = if restored {
            SlotState::Restored
        } else {
            SlotState::Uninstalled
        };
        restored
    }

    fn original_pair(&self) -> Option<(Callback<F>, Target)> {
        let original = self.original.as_ref()?;
        match (&original.action, original.target) {
            (Some(action), Some(target)) => Some((action.clone(), target)),
            _ => None,
        }
    }
}

/// Hook state of one attached keyboard.
///
/// The device is shared with the registry. Dropping the entry restores both
/// slots.
pub struct HookedKeyboard {
    device: Arc<dyn HookableKeyboard>,
    device_type: DeviceType,
    own: OwnCallbacks,
    keyboard_event: HookSlot<KeyboardEventFn>,
    update_flags: HookSlot<UpdateFlagsFn>,
    in_progress: bool,
    replaced: bool,
}

impl HookedKeyboard {
    pub fn new(device: Arc<dyn HookableKeyboard>, own: OwnCallbacks) -> Self {
        let device_type = device.device_type();
        Self {
            device,
            device_type,
            own,
            keyboard_event: HookSlot::new(),
            update_flags: HookSlot::new(),
            in_progress: false,
            replaced: false,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.device.id()
    }

    pub fn device(&self) -> &Arc<dyn HookableKeyboard> {
        &self.device
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn is_replaced(&self) -> bool {
        self.replaced
    }

    pub fn status(&self) -> HookStatus {
        HookStatus {
            keyboard_event: self.keyboard_event.state,
            update_flags: self.update_flags.state,
            in_progress: self.in_progress,
            replaced: self.replaced,
        }
    }

    /// Captured original keyboard event callback and target
    pub fn original_keyboard_event(&self) -> Option<(KeyboardEventCallback, Target)> {
        self.keyboard_event.original_pair()
    }

    /// Captured original update flags callback and target
    pub fn original_update_flags(&self) -> Option<(UpdateFlagsCallback, Target)> {
        self.update_flags.original_pair()
    }

    /// Decide whether this device should be hooked under `policy`
    pub fn evaluate(&self, policy: &Policy) -> HookDecision {
        match self.exclusion(policy) {
            Some(reason) => HookDecision::Restore(reason),
            None => HookDecision::Install,
        }
    }

    fn exclusion(&self, policy: &Policy) -> Option<ExclusionReason> {
        use ExclusionReason::*;

        if self.device.event_slots().is_none() {
            return Some(NoEventSlots);
        }
        match self.device.name() {
            None => return Some(NoName),
            Some(name) if is_consumer(&name) => return Some(ConsumerDevice),
            Some(_) => {}
        }

        if !policy.is_initialized() {
            return Some(PolicyNotInitialized);
        }
        if !policy.get(PolicyToggle::AutomaticallyEnableKeyboardDevice) {
            return Some(AutoEnableOff);
        }

        let device_type = self.device_type;
        if policy.get(PolicyToggle::DontRemapThirdvendorKeyboard) && !device_type.is_first_party() {
            return Some(ThirdVendorKeyboard);
        }
        if policy.get(PolicyToggle::DontRemapInternal) && device_type == DeviceType::AppleInternal {
            return Some(InternalKeyboard);
        }
        if policy.get(PolicyToggle::DontRemapExternal) && device_type != DeviceType::AppleInternal {
            return Some(ExternalKeyboard);
        }

        let identifier = self.device.identifier();
        let is_apple = identifier.is_equal_vendor(vendor::APPLE_COMPUTER);
        if policy.get(PolicyToggle::DontRemapAppleKeyboard) && is_apple {
            return Some(AppleKeyboard);
        }
        if policy.get(PolicyToggle::DontRemapNonAppleKeyboard) && !is_apple {
            return Some(NonAppleKeyboard);
        }

        // Emits keyboard-like traffic from its volume buttons
        if identifier.is_equal_vendor_product(vendor::LOGITECH, product::LOGITECH_USB_HEADSET) {
            return Some(LogitechUsbHeadset);
        }

        // Virtual devices report 0/0. USB Overdrive does too and is allowed.
        if identifier.is_equal_vendor_product(vendor::PSEUDO, product::PSEUDO)
            && !policy.get(PolicyToggle::AllowDevicesVendorIdProductIdAreZero)
            && device_type != DeviceType::UsbOverdrive
        {
            return Some(PseudoIdentity);
        }

        None
    }

    /// Evaluate and then install or restore.
    ///
    /// Returns whether any slot was written.
    pub fn refresh(&mut self, policy: &Policy) -> bool {
        match self.evaluate(policy) {
            HookDecision::Install => self.install(),
            HookDecision::Restore(reason) => {
                if self.replaced || self.in_progress {
                    log::debug!("HookedKeyboard::refresh {} excluded: {}", self.id(), reason);
                }
                self.restore()
            }
        }
    }

    /// Take over both slots.
    ///
    /// Safe to call on every event: an already hooked slot is left alone, a
    /// slot a driver has reclaimed is taken over again.
    pub fn install(&mut self) -> bool {
        let device = Arc::clone(&self.device);
        let Some(slots) = device.event_slots() else {
            return false;
        };
        let id = self.id();

        let keyboard_event = slots.keyboard_event();
        let replaced_keyboard_event = self.keyboard_event.install(
            keyboard_event.clone(),
            &self.own.keyboard_event,
            |binding| slots.set_keyboard_event(binding),
        );
        if replaced_keyboard_event {
            log::debug!(
                "HookedKeyboard::install (keyboard event) {}: {:?} -> {:?}",
                id,
                keyboard_event.action,
                self.own.keyboard_event
            );
        } else if self.keyboard_event.state == SlotState::InstallPending {
            log::debug!("HookedKeyboard::install (keyboard event) {}: slot is empty", id);
        }

        let update_flags = slots.update_flags();
        let replaced_update_flags = self.update_flags.install(
            update_flags.clone(),
            &self.own.update_flags,
            |binding| slots.set_update_flags(binding),
        );
        if replaced_update_flags {
            log::debug!(
                "HookedKeyboard::install (update flags) {}: {:?} -> {:?}",
                id,
                update_flags.action,
                self.own.update_flags
            );
        } else if self.update_flags.state == SlotState::InstallPending {
            log::debug!("HookedKeyboard::install (update flags) {}: slot is empty", id);
        }

        self.sync_flags();
        replaced_keyboard_event || replaced_update_flags
    }

    /// Give both slots back to their captured originals.
    ///
    /// Slots taken over by a third party are not touched. Captured originals
    /// are cleared in every case.
    pub fn restore(&mut self) -> bool {
        let device = Arc::clone(&self.device);
        let slots = device.event_slots();
        let id = self.id();

        let restored_keyboard_event = self.keyboard_event.restore(
            slots.map(|s| s.keyboard_event()),
            &self.own.keyboard_event,
            |binding| {
                log::debug!(
                    "HookedKeyboard::restore (keyboard event) {}: -> {:?}",
                    id,
                    binding.action
                );
                if let Some(slots) = slots {
                    slots.set_keyboard_event(binding);
                }
            },
        );
        let restored_update_flags = self.update_flags.restore(
            slots.map(|s| s.update_flags()),
            &self.own.update_flags,
            |binding| {
                log::debug!(
                    "HookedKeyboard::restore (update flags) {}: -> {:?}",
                    id,
                    binding.action
                );
                if let Some(slots) = slots {
                    slots.set_update_flags(binding);
                }
            },
        );

        self.sync_flags();
        restored_keyboard_event || restored_update_flags
    }

    fn sync_flags(&mut self) {
        self.in_progress = self.keyboard_event.state == SlotState::InstallPending
            || self.update_flags.state == SlotState::InstallPending;
        self.replaced = self.keyboard_event.original.is_some() || self.update_flags.original.is_some();
    }
}

impl Drop for HookedKeyboard {
    fn drop(&mut self) {
        log::debug!("HookedKeyboard::drop {}", self.id());
        self.restore();
    }
}

impl fmt::Debug for HookedKeyboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookedKeyboard")
            .field("id", &self.id())
            .field("device_type", &self.device_type)
            .field("status", &self.status())
            .finish()
    }
}
