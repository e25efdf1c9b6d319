//! Critical section handling
//!
//! The shared scheduler state is mutated from thread context and read by
//! the context-switch trampoline, so every thread-side access happens with
//! scheduling halted. The guard here flips the published scheduler state to
//! `Stopped` for its scope; the tick interrupt keeps firing (the millisecond
//! clock must not stall) but the trampoline observes `Stopped` and declines
//! to switch.

use core::sync::atomic::Ordering;

use crate::kernel;
use crate::types::SchedulerState;

/// Halt scheduling and return the prior state
///
/// Interrupts are disabled only for the state flip itself.
pub fn stop() -> SchedulerState {
    #[cfg(target_arch = "arm")]
    cortex_m::interrupt::disable();

    let old = SchedulerState::from_raw(kernel::current_active.load(Ordering::Relaxed));
    kernel::current_active.store(SchedulerState::Stopped as i32, Ordering::Relaxed);

    #[cfg(target_arch = "arm")]
    unsafe { cortex_m::interrupt::enable() };

    old
}

/// Restore a scheduler state previously returned by [`stop`]
///
/// Returns the state that was current before the call.
pub fn start(prev: SchedulerState) -> SchedulerState {
    #[cfg(target_arch = "arm")]
    cortex_m::interrupt::disable();

    let old = SchedulerState::from_raw(kernel::current_active.load(Ordering::Relaxed));
    kernel::current_active.store(prev as i32, Ordering::Relaxed);

    #[cfg(target_arch = "arm")]
    unsafe { cortex_m::interrupt::enable() };

    old
}

/// RAII guard for scheduler critical sections
///
/// Construction halts scheduling and records the prior state; dropping the
/// guard restores it. Guards nest: the inner guard records `Stopped` and the
/// outer restore wins.
pub struct CriticalSection {
    saved: SchedulerState,
}

impl CriticalSection {
    /// Enter a critical section by halting scheduling.
    #[inline(always)]
    pub fn enter() -> Self {
        CriticalSection { saved: stop() }
    }

    /// The scheduler state that was current when this guard was taken
    #[inline(always)]
    pub fn prior_state(&self) -> SchedulerState {
        self.saved
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        start(self.saved);
    }
}

/// Execute a closure with scheduling halted
///
/// The closure receives a reference to the guard, which unlocks the
/// kernel's guarded thread table for its scope.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// Check if currently executing in an ISR context
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        let ipsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {}, IPSR",
                out(reg) ipsr,
                options(nomem, nostack, preserves_flags)
            );
        }
        ipsr != 0
    }

    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}
