// Hookmap Remap Engine
// Inbound events from hooked slots, rule evaluation and forwarding to the
// captured original callbacks

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::device::{sync_toggle, DeviceId, HookableKeyboard};
use crate::event::{Clock, EventError, EventType, KeyEvent, MonotonicClock};
use crate::hook::{
    HookStatus, HookedKeyboardList, KeyboardEventCallback, OwnCallbacks, UpdateFlagsCallback,
};
use crate::policy::{Policy, PolicyToggle};
use crate::rule::{RepeatDefaults, RepeatDirective, RuleList};
use crate::{Flags, ModifierFlag};

use super::lock::with_lock_released;
use super::timer::DebounceTimer;

/// Engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Quiet period after the last forwarded key before the caps lock LED is
    /// synced
    pub led_sync_delay: Duration,
    /// Repeat timing for rules that leave it unset
    pub repeat: RepeatDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            led_sync_delay: Duration::from_millis(5),
            repeat: RepeatDefaults::default(),
        }
    }
}

/// Key repeat service fed by key-to-key rules.
///
/// Always called with the engine lock released.
pub trait KeyRepeatRegistry: Send + Sync {
    fn start(&self, id: usize, event: &KeyEvent, delay: Duration, interval: Duration);
    fn cancel(&self, id: usize);
}

/// Registry that ignores every request
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeyRepeat;

impl KeyRepeatRegistry for NoKeyRepeat {
    fn start(&self, id: usize, event: &KeyEvent, _delay: Duration, _interval: Duration) {
        log::trace!("NoKeyRepeat::start #{} {}", id, event);
    }

    fn cancel(&self, id: usize) {
        log::trace!("NoKeyRepeat::cancel #{}", id);
    }
}

/// Errors surfaced by the engine API
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to start LED timer: {0}")]
    TimerSpawn(#[from] std::io::Error),

    #[error("Rejected event: {0}")]
    InvalidEvent(#[from] EventError),
}

struct EngineState {
    keyboards: HookedKeyboardList,
    rules: RuleList,
    // Flags of the last forwarded event or flag update
    flag_status: Flags,
    policy: Policy,
}

struct EngineInner {
    state: Mutex<EngineState>,
    own: OwnCallbacks,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    repeat: Arc<dyn KeyRepeatRegistry>,
    timer: DebounceTimer,
}

/// The hook and remap engine.
///
/// Owns the hooked keyboard list, rule list, flag aggregate, policy and LED
/// timer behind one lock. Dropping the engine restores every hooked slot.
pub struct RemapEngine {
    inner: Arc<EngineInner>,
}

impl RemapEngine {
    /// Engine with default tuning, a monotonic clock and no key repeat
    pub fn new() -> Result<Self, EngineError> {
        Self::with_collaborators(
            EngineConfig::default(),
            Arc::new(MonotonicClock::new()),
            Arc::new(NoKeyRepeat),
        )
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_collaborators(config, Arc::new(MonotonicClock::new()), Arc::new(NoKeyRepeat))
    }

    pub fn with_collaborators(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        repeat: Arc<dyn KeyRepeatRegistry>,
    ) -> Result<Self, EngineError> {
        let inner = Arc::new_cyclic(|weak: &Weak<EngineInner>| EngineInner {
            state: Mutex::new(EngineState {
                keyboards: HookedKeyboardList::new(),
                rules: RuleList::new(),
                flag_status: Flags::empty(),
                policy: Policy::new(),
            }),
            own: own_callbacks(weak),
            config,
            clock,
            repeat,
            timer: DebounceTimer::new(),
        });

        let weak = Arc::downgrade(&inner);
        inner.timer.start("hookmap-led", move || {
            if let Some(inner) = weak.upgrade() {
                inner.sync_capslock_led();
            }
        })?;

        Ok(Self { inner })
    }

    /// The callbacks this engine writes into hooked slots
    pub fn own_callbacks(&self) -> &OwnCallbacks {
        &self.inner.own
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Register a device and hook it if the policy allows.
    ///
    /// Returns whether a slot was taken over.
    pub fn attach(&self, device: Arc<dyn HookableKeyboard>) -> bool {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        log::debug!("RemapEngine::attach {}", device.id());
        state
            .keyboards
            .attach(device, self.inner.own.clone(), &state.policy)
    }

    /// Forget a device, restoring its slots
    pub fn detach(&self, id: DeviceId) -> bool {
        let mut state = self.inner.state.lock();
        log::debug!("RemapEngine::detach {}", id);
        state.keyboards.detach(id)
    }

    /// Replace the policy and re-evaluate every device
    pub fn set_policy(&self, policy: Policy) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.policy = policy;
        state
            .rules
            .set_pass_through(state.policy.get(PolicyToggle::RemapPassThrough));
        state.keyboards.refresh_all(&state.policy);
    }

    pub fn policy(&self) -> Policy {
        self.inner.state.lock().policy.clone()
    }

    /// Replace the rule list and re-evaluate every device
    pub fn load_rules(&self, rules: RuleList) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        log::debug!("RemapEngine::load_rules {} rules", rules.len());
        state.rules = rules;
        state
            .rules
            .set_pass_through(state.policy.get(PolicyToggle::RemapPassThrough));
        state.keyboards.refresh_all(&state.policy);
    }

    /// Re-evaluate every device against the current policy
    pub fn refresh(&self) -> usize {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        state.keyboards.refresh_all(&state.policy)
    }

    /// Entry point of the engine's keyboard event callback
    pub fn push_keyboard_event(&self, sender: DeviceId, event: KeyEvent) -> Result<(), EngineError> {
        self.inner.push_keyboard_event(sender, event)
    }

    /// Entry point of the engine's update flags callback
    pub fn push_update_event_flags(&self, sender: DeviceId, flags: Flags) {
        self.inner.push_update_event_flags(sender, flags)
    }

    pub fn is_hooked(&self, id: DeviceId) -> bool {
        self.inner
            .state
            .lock()
            .keyboards
            .get(id)
            .is_some_and(|entry| entry.is_replaced())
    }

    pub fn hook_status(&self, id: DeviceId) -> Option<HookStatus> {
        self.inner.state.lock().keyboards.get(id).map(|entry| entry.status())
    }

    /// Attached device ids in attach order
    pub fn devices(&self) -> Vec<DeviceId> {
        self.inner.state.lock().keyboards.iter().map(|entry| entry.id()).collect()
    }

    /// Flags of the last forwarded event
    pub fn flag_status(&self) -> Flags {
        self.inner.state.lock().flag_status
    }

    /// Push the caps lock state to the LEDs of hooked first-party keyboards
    pub fn sync_capslock_led(&self) {
        self.inner.sync_capslock_led()
    }

    pub fn led_timer_pending(&self) -> bool {
        self.inner.timer.is_pending()
    }

    /// Stop the LED timer and restore every hooked slot
    pub fn shutdown(&self) {
        self.inner.timer.shutdown();
        self.inner.state.lock().keyboards.clear();
    }
}

impl Drop for RemapEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn own_callbacks(weak: &Weak<EngineInner>) -> OwnCallbacks {
    let keyboard_inner = weak.clone();
    let flags_inner = weak.clone();
    OwnCallbacks {
        keyboard_event: KeyboardEventCallback::new(move |_target, event, _ts, sender| {
            if let Some(inner) = keyboard_inner.upgrade() {
                // Rejections are already logged
                let _ = inner.push_keyboard_event(sender, *event);
            }
        }),
        update_flags: UpdateFlagsCallback::new(move |_target, flags, sender| {
            if let Some(inner) = flags_inner.upgrade() {
                inner.push_update_event_flags(sender, flags);
            }
        }),
    }
}

impl EngineInner {
    fn push_keyboard_event(&self, sender: DeviceId, event: KeyEvent) -> Result<(), EngineError> {
        if let Err(e) = event.validate() {
            log::error!("RemapEngine::push_keyboard_event rejected {}: {}", event, e);
            return Err(e.into());
        }

        let mut guard = self.state.lock();
        let device = {
            let state = &mut *guard;
            match state.keyboards.get_mut(sender) {
                Some(entry) => {
                    entry.refresh(&state.policy);
                    Arc::clone(entry.device())
                }
                None => {
                    log::debug!("RemapEngine::push_keyboard_event unknown sender {}", sender);
                    return Ok(());
                }
            }
        };

        if guard.rules.remap_force_num_lock_on(&device.identifier()) {
            with_lock_released(&mut guard, || {
                if sync_toggle(device.num_lock(), true, |on| device.set_num_lock(on)) {
                    log::debug!("RemapEngine forced num lock on for {}", sender);
                }
            });
        }

        let mut event = event;
        guard
            .rules
            .remap_set_keyboard_type(&mut event.keyboard_type, event.flags);

        let repeat = self.config.repeat;
        match guard.rules.remap(&event, &repeat) {
            None => {
                self.apply_key(&mut guard, sender, &event);
            }
            Some(output) => {
                for remapped in &output.events {
                    self.apply_key(&mut guard, sender, remapped);
                }
                if let Some(directive) = output.repeat {
                    let registry = Arc::clone(&self.repeat);
                    with_lock_released(&mut guard, || match directive {
                        RepeatDirective::Start {
                            id,
                            event,
                            delay,
                            interval,
                        } => registry.start(id, &event, delay, interval),
                        RepeatDirective::Cancel { id } => registry.cancel(id),
                    });
                }
            }
        }
        Ok(())
    }

    fn push_update_event_flags(&self, sender: DeviceId, flags: Flags) {
        let mut guard = self.state.lock();
        {
            let state = &mut *guard;
            match state.keyboards.get_mut(sender) {
                Some(entry) => {
                    entry.refresh(&state.policy);
                }
                None => {
                    log::debug!("RemapEngine::push_update_event_flags unknown sender {}", sender);
                    return;
                }
            }
        }
        self.apply_flags(&mut guard, sender, flags);
    }

    /// Forward a key event to the sender's original callback.
    ///
    /// Returns whether the event was delivered.
    fn apply_key(&self, guard: &mut MutexGuard<'_, EngineState>, sender: DeviceId, event: &KeyEvent) -> bool {
        if let Err(e) = event.validate() {
            log::error!("RemapEngine::apply rejected {}: {}", event, e);
            return false;
        }
        if guard.rules.drop_key_after_remap(event) {
            log::debug!("RemapEngine::apply dropped {}", event);
            return false;
        }

        let (original, original_flags) = match guard.keyboards.get(sender) {
            Some(entry) => match entry.original_keyboard_event() {
                Some(original) => (original, entry.original_update_flags()),
                None => return false,
            },
            None => return false,
        };

        guard.flag_status = event.flags;

        let numpad = event.flags.contains(ModifierFlag::Numpad);
        let event = *event;
        let now = self.clock.now();
        log::debug!("RemapEngine::apply {} {}", sender, event);

        with_lock_released(guard, || {
            let (action, target) = &original;
            if numpad && event.event_type == EventType::Down {
                if let Some((update, flags_target)) = &original_flags {
                    update(flags_target, event.flags, sender);
                }
            }
            action(target, &event, now, sender);
            if numpad && event.event_type == EventType::Up {
                if let Some((update, flags_target)) = &original_flags {
                    update(flags_target, event.flags.stripped_numpad(), sender);
                }
            }
        });

        self.timer.schedule(self.config.led_sync_delay);
        true
    }

    /// Forward a flag update to the sender's original callback
    fn apply_flags(&self, guard: &mut MutexGuard<'_, EngineState>, sender: DeviceId, flags: Flags) -> bool {
        let original = match guard.keyboards.get(sender) {
            Some(entry) => match entry.original_update_flags() {
                Some(original) => original,
                None => return false,
            },
            None => return false,
        };

        guard.flag_status = flags;
        log::debug!("RemapEngine::apply {} flags:{}", sender, flags);

        with_lock_released(guard, || {
            let (action, target) = &original;
            action(target, flags, sender);
        });
        true
    }

    fn sync_capslock_led(&self) {
        let mut guard = self.state.lock();
        if guard.policy.get(PolicyToggle::PassthroughCapslockLedStatus) {
            return;
        }

        let desired = guard.flag_status.contains(ModifierFlag::CapsLock);
        let devices: Vec<Arc<dyn HookableKeyboard>> = guard
            .keyboards
            .iter()
            .filter(|entry| entry.is_replaced() && entry.device_type().is_first_party())
            .map(|entry| Arc::clone(entry.device()))
            .collect();

        with_lock_released(&mut guard, || {
            for device in &devices {
                if sync_toggle(device.alpha_lock(), desired, |on| device.set_alpha_lock(on)) {
                    log::debug!("RemapEngine::sync_capslock_led {} -> {}", device.id(), desired);
                }
            }
        });
    }
}
