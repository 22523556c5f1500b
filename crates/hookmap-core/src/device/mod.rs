// Hookmap Device Layer
// Device identity, the registry capability interface and a simulated keyboard

mod capability;
mod filter;
mod identity;
pub mod sim;

pub use capability::{sync_toggle, EventSlots, HookableKeyboard};
pub use filter::is_consumer;
pub use identity::{product, vendor, DeviceId, DeviceIdentifier, DeviceType};
pub use sim::SimulatedKeyboard;
