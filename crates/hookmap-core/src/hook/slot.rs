// Hookmap Callback Slots
// Callback handles and the {action, target} pair stored in a device slot

use std::fmt;
use std::sync::Arc;

use crate::device::DeviceId;
use crate::event::{KeyEvent, Timestamp};
use crate::Flags;

/// Receiver object captured together with a slot callback.
///
/// Opaque to the engine; it is only handed back to the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target(pub u64);

/// Signature of the keyboard event slot
pub type KeyboardEventFn = dyn Fn(&Target, &KeyEvent, Timestamp, DeviceId) + Send + Sync;

/// Signature of the modifier flag update slot
pub type UpdateFlagsFn = dyn Fn(&Target, Flags, DeviceId) + Send + Sync;

/// Shared handle to a slot callback.
///
/// Identity is pointer identity, which is how the hook manager tells its own
/// callback apart from whatever a driver installed.
pub struct Callback<F: ?Sized>(Arc<F>);

impl<F: ?Sized> Callback<F> {
    pub fn from_arc(f: Arc<F>) -> Self {
        Callback(f)
    }

    /// Same underlying function object
    pub fn same(&self, other: &Callback<F>) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<F: ?Sized> Clone for Callback<F> {
    fn clone(&self) -> Self {
        Callback(Arc::clone(&self.0))
    }
}

impl<F: ?Sized> std::ops::Deref for Callback<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.0
    }
}

impl<F: ?Sized> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:#x})", self.addr())
    }
}

pub type KeyboardEventCallback = Callback<KeyboardEventFn>;
pub type UpdateFlagsCallback = Callback<UpdateFlagsFn>;

impl KeyboardEventCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Target, &KeyEvent, Timestamp, DeviceId) + Send + Sync + 'static,
    {
        Callback(Arc::new(f))
    }
}

impl UpdateFlagsCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Target, Flags, DeviceId) + Send + Sync + 'static,
    {
        Callback(Arc::new(f))
    }
}

/// Content of one hookable slot
pub struct SlotBinding<F: ?Sized> {
    pub action: Option<Callback<F>>,
    pub target: Option<Target>,
}

impl<F: ?Sized> SlotBinding<F> {
    pub fn new(action: Callback<F>, target: Target) -> Self {
        Self {
            action: Some(action),
            target: Some(target),
        }
    }

    /// A slot with nothing installed
    pub fn empty() -> Self {
        Self {
            action: None,
            target: None,
        }
    }

    /// The slot currently holds `callback`
    pub fn holds(&self, callback: &Callback<F>) -> bool {
        self.action.as_ref().is_some_and(|action| action.same(callback))
    }

    /// Same action (by identity) and same target
    pub fn same(&self, other: &SlotBinding<F>) -> bool {
        let same_action = match (&self.action, &other.action) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        };
        same_action && self.target == other.target
    }
}

impl<F: ?Sized> Clone for SlotBinding<F> {
    fn clone(&self) -> Self {
        Self {
            action: self.action.clone(),
            target: self.target,
        }
    }
}

impl<F: ?Sized> Default for SlotBinding<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: ?Sized> fmt::Debug for SlotBinding<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotBinding")
            .field("action", &self.action)
            .field("target", &self.target)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> KeyboardEventCallback {
        KeyboardEventCallback::new(|_, _, _, _| {})
    }

    #[test]
    fn test_callback_identity() {
        let a = noop();
        let b = noop();
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn test_binding_holds() {
        let a = noop();
        let b = noop();
        let binding = SlotBinding::new(a.clone(), Target(7));
        assert!(binding.holds(&a));
        assert!(!binding.holds(&b));
        assert!(!SlotBinding::<KeyboardEventFn>::empty().holds(&a));
    }

    #[test]
    fn test_binding_same_compares_target() {
        let a = noop();
        let first = SlotBinding::new(a.clone(), Target(1));
        let second = SlotBinding::new(a, Target(2));
        assert!(first.same(&first.clone()));
        assert!(!first.same(&second));
        assert!(SlotBinding::<UpdateFlagsFn>::empty().same(&SlotBinding::empty()));
    }
}
