//! Time management
//!
//! The millisecond clock, delays, and time-slice configuration. The clock
//! is advanced by the system tick interrupt regardless of which timer
//! drives context switches, so deadlines keep working after a move to the
//! microsecond timer.

use core::sync::atomic::Ordering;

use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::kernel::{current_use_systick, systick_millis_count, THREADS};
use crate::port;
use crate::thread;
use crate::types::{ThreadId, ThreadState, Tick};

/// Milliseconds since the kernel tick was armed
#[inline]
pub fn millis() -> u32 {
    systick_millis_count.load(Ordering::Relaxed)
}

/// Yield-loop until at least `ms` milliseconds have passed
///
/// Other threads run during the wait. With scheduling stopped this spins
/// without switching, so callers must ensure scheduling is active.
pub fn delay(ms: u32) {
    let start = millis();
    while millis().wrapping_sub(start) < ms {
        thread::yield_now();
    }
}

/// Per-thread slice override: `id` runs `ticks` ticks per slice
///
/// The countdown is inclusive of zero, so the stored budget is one less
/// than the requested count.
pub fn set_time_slice(id: ThreadId, ticks: Tick) -> OsResult<()> {
    critical_section(|cs| {
        let d = THREADS.get(cs).checked_mut(id)?;
        if d.flags == ThreadState::Empty {
            return Err(OsError::InvalidThread);
        }
        d.ticks = ticks.saturating_sub(1);
        Ok(())
    })
}

/// Slice length, in ticks, for threads created from now on
pub fn set_default_time_slice(ticks: Tick) {
    critical_section(|cs| {
        THREADS.get(cs).default_ticks = ticks.saturating_sub(1);
    });
}

/// Drive context switches from the microsecond interval timer
///
/// The timer is brought up at the lowest interrupt priority and wired to
/// the context-switch trampoline; the system tick keeps running but only
/// advances the millisecond clock afterwards.
pub fn set_micro_timer(us: u32) -> OsResult<()> {
    port::micro_timer_init(us)?;
    current_use_systick.store(0, Ordering::Relaxed);
    Ok(())
}

/// Make each time slice `us` microseconds long
///
/// One timer fire equals one switch.
pub fn set_slice_micros(us: u32) -> OsResult<()> {
    set_micro_timer(us)?;
    set_default_time_slice(1);
    Ok(())
}

/// Make each time slice `ms` milliseconds long
///
/// On the system tick this is just a default-budget change. Once the
/// microsecond timer has taken over, the slice is re-expressed in
/// microseconds instead of re-arming the system tick.
pub fn set_slice_millis(ms: u32) -> OsResult<()> {
    if current_use_systick.load(Ordering::Relaxed) != 0 {
        set_default_time_slice(ms);
        Ok(())
    } else {
        set_slice_micros(ms.saturating_mul(1000))
    }
}
