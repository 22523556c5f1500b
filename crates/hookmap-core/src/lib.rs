// Hookmap Core Library
// Device hooking, remap rules and event forwarding for keyboard drivers

pub mod device;
pub mod engine;
pub mod event;
pub mod hook;
pub mod key;
pub mod modifier;
pub mod policy;
pub mod rule;

pub use device::{DeviceId, DeviceIdentifier, DeviceType, HookableKeyboard, SimulatedKeyboard};
pub use engine::{EngineConfig, EngineError, KeyRepeatRegistry, NoKeyRepeat, RemapEngine};
pub use event::{Clock, EventError, EventType, KeyEvent, KeyboardType, MonotonicClock, Timestamp};
pub use hook::{HookDecision, HookStatus, HookedKeyboard, HookedKeyboardList, SlotState};
pub use key::KeyCode;
pub use modifier::{Flags, ModifierFlag};
pub use policy::{Policy, PolicyError, PolicyToggle};
pub use rule::{RemapRule, RuleBuildError, RuleList, RuleRecord, StreamError};
