//! Port layer - CPU-specific implementations
//!
//! Interrupt plumbing, tick timers and the yield SVCs live here. The
//! synthetic exception frame is plain memory layout and is shared across
//! targets so the bootstrap logic can be exercised off-target.

pub mod frame;

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::*;

// Stub implementations for non-ARM targets (for testing)
#[cfg(not(target_arch = "arm"))]
pub mod stub {
    use core::sync::atomic::Ordering;

    use crate::error::OsResult;
    use crate::kernel::{current_active, systick_millis_count};
    use crate::types::SchedulerState;

    /// Host builds have no tick interrupt; yielding advances the
    /// millisecond clock by one so spin-yield loops make progress in tests.
    pub fn yield_svc() {
        systick_millis_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn yield_and_start_svc() {
        current_active.store(SchedulerState::Started as i32, Ordering::Relaxed);
        yield_svc();
    }

    pub fn systick_init(_core_hz: u32) {
        // No-op for testing
    }

    pub fn micro_timer_init(_us: u32) -> OsResult<()> {
        // Pretend the timer came up so the slice configuration paths are
        // testable on the host.
        Ok(())
    }

    pub fn idle() {
        core::hint::spin_loop();
    }

    /// Data memory barrier
    pub fn dmb() {
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(not(target_arch = "arm"))]
pub use stub::*;
