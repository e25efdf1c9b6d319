//! Compile-time configuration
//!
//! These constants control the resource limits of the kernel.

/// Number of thread slots, including slot 0 (the main context)
pub const CFG_MAX_THREADS: usize = 8;

/// System tick rate in Hz (one tick per millisecond)
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Default tick budget per time slice
pub const CFG_DEFAULT_TICKS: u32 = 10;

/// Default stack size in bytes for kernel-allocated stacks
pub const CFG_DEFAULT_STACK_SIZE: usize = 1024;

/// Minimum thread stack size in bytes
pub const CFG_STK_SIZE_MIN: usize = 256;

/// Input clock of the microsecond interval timer
pub const CFG_TIMER_CLOCK_HZ: u32 = 16_000_000;

/// Stack alignment required by the AAPCS at a public interface
pub const CFG_STK_ALIGN: usize = 8;
