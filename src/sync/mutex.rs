//! Blocking mutex
//!
//! Mutual exclusion between threads on one CPU. Contention is resolved by
//! suspension rather than spinning where possible: one waiter may park
//! itself on the mutex, and `unlock` wakes it with a one-shot priority
//! boost carrying the tick budget it had left when it parked. Any further
//! contenders, and all contenders with a deadline, spin-yield instead.
//!
//! The single parking slot is a deliberate, documented limit of the
//! design; a FIFO wait queue would be a compatible extension.

use core::cell::UnsafeCell;
use core::sync::atomic::Ordering;

use crate::critical::{self, CriticalSection};
use crate::error::{OsError, OsResult};
use crate::kernel::{current_tick_count, THREADS};
use crate::port;
use crate::thread;
use crate::time;
use crate::types::{ThreadId, ThreadState, Tick};

struct MutexState {
    locked: bool,
    /// The one thread parked on this mutex, if any
    wait_thread: Option<ThreadId>,
    /// Tick budget the parked thread gets back on wake-up
    wait_ticks: Tick,
}

/// Blocking mutex
pub struct Mutex {
    inner: UnsafeCell<MutexState>,
}

unsafe impl Send for Mutex {}
unsafe impl Sync for Mutex {}

impl Mutex {
    /// Create an unlocked mutex
    pub const fn new() -> Self {
        Mutex {
            inner: UnsafeCell::new(MutexState {
                locked: false,
                wait_thread: None,
                wait_ticks: 0,
            }),
        }
    }

    /// Take the lock if it is free. Never blocks.
    pub fn try_lock(&self) -> bool {
        let prev = critical::stop();
        // SAFETY: scheduling is stopped; no other thread can run.
        let state = unsafe { &mut *self.inner.get() };
        let acquired = if state.locked {
            false
        } else {
            state.locked = true;
            true
        };
        critical::start(prev);
        acquired
    }

    /// Take the lock, blocking up to `timeout_ms` milliseconds
    ///
    /// `timeout_ms == 0` waits forever; a waiter with no deadline parks
    /// itself (if the parking slot is free) and sleeps until `unlock` wakes
    /// it. Waiters with a deadline spin-yield so the deadline stays
    /// observable.
    ///
    /// # Errors
    /// * [`OsError::Timeout`] - the deadline passed without acquisition
    pub fn lock(&self, timeout_ms: u32) -> OsResult<()> {
        if self.try_lock() {
            return Ok(());
        }

        let start = time::millis();
        loop {
            if self.try_lock() {
                port::dmb();
                return Ok(());
            }
            if timeout_ms != 0 && time::millis().wrapping_sub(start) > timeout_ms {
                return Err(OsError::Timeout);
            }

            if timeout_ms == 0 {
                let cs = CriticalSection::enter();
                // SAFETY: scheduling is stopped for the guard's scope.
                let state = unsafe { &mut *self.inner.get() };
                if state.wait_thread.is_none() {
                    let table = THREADS.get(&cs);
                    let me = table.current;
                    state.wait_thread = Some(me);
                    state.wait_ticks = current_tick_count.load(Ordering::Relaxed).max(0) as Tick;
                    table.thread[me].flags = ThreadState::Suspended;
                }
                drop(cs);
                port::dmb();
            }

            thread::yield_now();
        }
    }

    /// Release the lock
    ///
    /// If a waiter is parked it is boosted with its saved tick budget,
    /// restarted, and dispatched immediately via a switch that also turns
    /// scheduling back on - deliberately not restoring the state from
    /// before the call, so the handoff cannot be lost.
    pub fn unlock(&self) {
        let prev = critical::stop();
        // SAFETY: scheduling is stopped.
        let state = unsafe { &mut *self.inner.get() };
        if state.locked {
            state.locked = false;
            if let Some(waiter) = state.wait_thread.take() {
                let ticks = state.wait_ticks;
                let _ = thread::set_priority(waiter, ticks);
                let _ = thread::restart(waiter);
                port::dmb();
                thread::yield_and_start();
                return;
            }
        }
        port::dmb();
        critical::start(prev);
    }

    /// Whether the mutex is currently held
    pub fn get_state(&self) -> bool {
        let prev = critical::stop();
        // SAFETY: scheduling is stopped.
        let locked = unsafe { &*self.inner.get() }.locked;
        critical::start(prev);
        locked
    }

    /// [`lock`](Mutex::lock) returning an RAII guard that unlocks on drop
    pub fn lock_guard(&self, timeout_ms: u32) -> OsResult<MutexGuard<'_>> {
        self.lock(timeout_ms)?;
        Ok(MutexGuard { mutex: self })
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped ownership of a [`Mutex`]
pub struct MutexGuard<'a> {
    mutex: &'a Mutex,
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::critical::critical_section;

    fn parked_entry(_: *mut ()) {}

    #[test]
    fn try_lock_is_exclusive() {
        let m = Mutex::new();
        assert!(!m.get_state());
        assert!(m.try_lock());
        assert!(m.get_state());
        assert!(!m.try_lock());
        m.unlock();
        assert!(!m.get_state());
        assert!(m.try_lock());
    }

    #[test]
    fn unlock_of_a_free_mutex_is_harmless() {
        let m = Mutex::new();
        m.unlock();
        assert!(!m.get_state());
        assert!(m.try_lock());
    }

    #[test]
    fn lock_with_deadline_times_out_on_a_held_mutex() {
        // The host yield stub advances the millisecond clock, so the
        // spin-yield loop runs the deadline down.
        let m = Mutex::new();
        assert!(m.try_lock());
        assert_eq!(m.lock(10), Err(OsError::Timeout));
        m.unlock();
        assert_eq!(m.lock(10), Ok(()));
    }

    #[test]
    fn guard_unlocks_on_drop() {
        let m = Mutex::new();
        {
            let _guard = m.lock_guard(0).unwrap();
            assert!(m.get_state());
        }
        assert!(!m.get_state());
        assert!(m.try_lock());
    }

    #[test]
    fn unlock_boosts_and_restarts_the_parked_waiter() {
        let waiter = thread::add_thread(parked_entry, core::ptr::null_mut(), 0).unwrap();
        thread::suspend(waiter).unwrap();

        let m = Mutex::new();
        assert!(m.try_lock());
        {
            // Park the waiter by hand; on a target this happens inside
            // lock(0) before the thread suspends itself.
            let state = unsafe { &mut *m.inner.get() };
            state.wait_thread = Some(waiter);
            state.wait_ticks = 7;
        }

        m.unlock();

        assert!(!m.get_state());
        assert_eq!(thread::get_state(waiter), Ok(ThreadState::Running));
        let boost = critical_section(|cs| THREADS.get(cs).thread[waiter].priority);
        assert_eq!(boost, 7);
        let parked = unsafe { &*m.inner.get() }.wait_thread;
        assert_eq!(parked, None);

        thread::kill(waiter).unwrap();
    }
}
