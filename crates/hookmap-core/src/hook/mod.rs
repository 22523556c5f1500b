// Hookmap Hook Manager
// Takes over and gives back the callback slots of attached keyboards

mod entry;
mod list;
pub mod slot;

pub use entry::{
    ExclusionReason, HookDecision, HookStatus, HookedKeyboard, OwnCallbacks, SlotState,
};
pub use list::HookedKeyboardList;
pub use slot::{
    Callback, KeyboardEventCallback, KeyboardEventFn, SlotBinding, Target, UpdateFlagsCallback,
    UpdateFlagsFn,
};
