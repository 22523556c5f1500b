// Hookmap Debounce Timer
// A single rescheduling countdown running its action on a worker thread

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::lock::with_lock_released;

#[derive(Debug, Default)]
struct TimerState {
    deadline: Option<Instant>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

/// Debounced countdown.
///
/// Each `schedule` replaces the pending deadline, so a burst of calls fires
/// the action once, `delay` after the last call. There is no backlog.
pub struct DebounceTimer {
    shared: Arc<Shared>,
    worker: Mutex<Option<(JoinHandle<()>, ThreadId)>>,
}

impl DebounceTimer {
    /// Create a timer without a worker; deadlines are kept but never fire
    /// until [`start`](Self::start) is called
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the worker thread running `on_fire` at each deadline
    pub fn start<F>(&self, name: &str, on_fire: F) -> io::Result<()>
    where
        F: Fn() + Send + 'static,
    {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(&shared, on_fire))?;
        let thread_id = handle.thread().id();
        *worker = Some((handle, thread_id));
        Ok(())
    }

    /// Fire `delay` from now, replacing any pending deadline.
    ///
    /// A delay past the clock's range leaves nothing pending.
    pub fn schedule(&self, delay: Duration) {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            return;
        }
        state.deadline = Instant::now().checked_add(delay);
        if state.deadline.is_none() {
            log::error!("DebounceTimer::schedule delay {:?} out of range", delay);
        }
        self.shared.wake.notify_one();
    }

    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.deadline = None;
        self.shared.wake.notify_one();
    }

    pub fn is_pending(&self) -> bool {
        self.shared.state.lock().deadline.is_some()
    }

    /// Stop the worker and wait for it.
    ///
    /// Called from the worker itself (the action dropped the last owner), the
    /// thread is detached instead of joined.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.deadline = None;
            self.shared.wake.notify_one();
        }

        let worker = self.worker.lock().take();
        if let Some((handle, thread_id)) = worker {
            if thread::current().id() == thread_id {
                return;
            }
            if handle.join().is_err() {
                log::error!("DebounceTimer::shutdown worker panicked");
            }
        }
    }
}

impl Default for DebounceTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<F: Fn()>(shared: &Shared, on_fire: F) {
    let mut state = shared.state.lock();
    while !state.shutdown {
        let deadline = state.deadline;
        match deadline {
            None => shared.wake.wait(&mut state),
            Some(deadline) if Instant::now() >= deadline => {
                state.deadline = None;
                with_lock_released(&mut state, &on_fire);
            }
            Some(deadline) => {
                shared.wake.wait_until(&mut state, deadline);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_timer() -> (DebounceTimer, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let timer = DebounceTimer::new();
        timer
            .start("test-timer", move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        (timer, count)
    }

    #[test]
    fn test_fires_once_after_delay() {
        let (timer, count) = counting_timer();
        timer.schedule(Duration::from_millis(10));
        assert!(timer.is_pending());
        thread::sleep(Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_burst_coalesces() {
        let (timer, count) = counting_timer();
        for _ in 0..10 {
            timer.schedule(Duration::from_millis(50));
        }
        thread::sleep(Duration::from_millis(200));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel() {
        let (timer, count) = counting_timer();
        timer.schedule(Duration::from_millis(50));
        timer.cancel();
        thread::sleep(Duration::from_millis(120));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_schedule_after_shutdown_is_ignored() {
        let (timer, count) = counting_timer();
        timer.shutdown();
        timer.schedule(Duration::from_millis(1));
        assert!(!timer.is_pending());
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_out_of_range_delay_is_dropped() {
        let (timer, count) = counting_timer();
        timer.schedule(Duration::from_millis(10));
        timer.schedule(Duration::MAX);
        assert!(!timer.is_pending());
        thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
