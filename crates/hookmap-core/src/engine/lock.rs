// Hookmap Engine Lock
// Releasing the engine lock around calls into foreign code

use parking_lot::MutexGuard;

/// Run `f` with the lock behind `guard` released, re-acquiring it afterwards.
///
/// Foreign callbacks may re-enter the engine on the same thread, and the
/// engine lock is not reentrant. Anything `f` needs from the guarded state
/// must be cloned out before the call; the state may differ once the lock
/// is held again.
pub fn with_lock_released<T, R>(guard: &mut MutexGuard<'_, T>, f: impl FnOnce() -> R) -> R {
    MutexGuard::unlocked(guard, f)
}
