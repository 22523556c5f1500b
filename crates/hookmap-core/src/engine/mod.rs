// Hookmap Engine
// Forwarding pipeline, lock discipline and the caps lock LED timer

pub mod lock;
mod pipeline;
mod timer;

pub use lock::with_lock_released;
pub use pipeline::{EngineConfig, EngineError, KeyRepeatRegistry, NoKeyRepeat, RemapEngine};
pub use timer::DebounceTimer;
