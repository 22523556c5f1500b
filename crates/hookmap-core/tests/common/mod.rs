// Hookmap Test Support
// Simulated keyboards whose original callbacks record what reaches them

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use hookmap_core::device::{vendor, DeviceIdentifier, DeviceType, SimulatedKeyboard};
use hookmap_core::hook::{KeyboardEventCallback, SlotBinding, Target, UpdateFlagsCallback};
use hookmap_core::{DeviceId, EngineConfig, Flags, KeyEvent, NoKeyRepeat, Policy, RemapEngine};

/// What an original callback saw, in delivery order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seen {
    Key(KeyEvent),
    Flags(Flags),
}

pub type SeenLog = Arc<Mutex<Vec<Seen>>>;

/// A keyboard with recording originals in both slots
pub fn recording_keyboard(
    id: u64,
    identifier: DeviceIdentifier,
    device_type: DeviceType,
) -> (Arc<SimulatedKeyboard>, SeenLog) {
    let (device, log) = recording_device(id, identifier, device_type);
    (Arc::new(device), log)
}

/// Unshared form of [`recording_keyboard`], for further configuration
pub fn recording_device(
    id: u64,
    identifier: DeviceIdentifier,
    device_type: DeviceType,
) -> (SimulatedKeyboard, SeenLog) {
    let log: SeenLog = Arc::new(Mutex::new(Vec::new()));
    let keys = Arc::clone(&log);
    let flags = Arc::clone(&log);
    let device = SimulatedKeyboard::new(DeviceId(id), identifier, device_type)
        .with_keyboard_event(SlotBinding::new(
            KeyboardEventCallback::new(move |_, event, _, _| keys.lock().push(Seen::Key(*event))),
            Target(id * 10),
        ))
        .with_update_flags(SlotBinding::new(
            UpdateFlagsCallback::new(move |_, value, _| flags.lock().push(Seen::Flags(value))),
            Target(id * 10 + 1),
        ));
    (device, log)
}

pub fn apple_internal(id: u64) -> (Arc<SimulatedKeyboard>, SeenLog) {
    recording_keyboard(
        id,
        DeviceIdentifier::new(vendor::APPLE_COMPUTER, 0x0262, id as u32),
        DeviceType::AppleInternal,
    )
}

/// Engine with loaded default policy
pub fn engine_with(config: EngineConfig) -> RemapEngine {
    let engine = RemapEngine::with_collaborators(
        config,
        Arc::new(hookmap_core::MonotonicClock::new()),
        Arc::new(NoKeyRepeat),
    )
    .unwrap();
    engine.set_policy(Policy::loaded_defaults());
    engine
}

pub fn engine() -> RemapEngine {
    engine_with(EngineConfig::default())
}

/// Keys seen, ignoring flag updates
pub fn keys(log: &SeenLog) -> Vec<KeyEvent> {
    log.lock()
        .iter()
        .filter_map(|seen| match seen {
            Seen::Key(event) => Some(*event),
            Seen::Flags(_) => None,
        })
        .collect()
}
