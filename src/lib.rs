//! Preemptive multithreading for single-core ARM Cortex-M
//!
//! A small kernel providing:
//! - Multiple threads of execution, each with its own stack and register
//!   context, multiplexed onto one CPU
//! - Round-robin scheduling with a one-shot priority boost
//! - A millisecond system tick or a programmable microsecond slice timer
//! - A blocking mutex that parks one waiter and wakes it by boost
//!
//! The register save/restore itself is an external assembly routine; the
//! kernel publishes its state through the ABI documented in
//! [`port::cortex_m4`].

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod port;
pub mod sync;

// ============ Re-exports ============

pub use core::config;
pub use core::config::*;
pub use core::critical;
pub use core::critical::CriticalSection;
pub use core::error;
pub use core::error::{OsError, OsResult};
pub use core::kernel;
pub use core::kernel::{init, start, stop};
pub use core::sched;
pub use core::thread;
pub use core::thread::{
    add_thread, add_thread_with_stack, get_state, id, kill, restart, set_default_stack_size,
    set_priority, set_state, stack_remaining, stack_used, suspend, wait, yield_and_start,
    yield_now,
};
pub use core::time;
pub use core::time::{
    delay, millis, set_default_time_slice, set_micro_timer, set_slice_micros, set_slice_millis,
    set_time_slice,
};
pub use core::types;
pub use core::types::*;

#[cfg(feature = "mutex")]
pub use sync::mutex;
#[cfg(feature = "mutex")]
pub use sync::mutex::{Mutex, MutexGuard};
