//! Thread descriptor definition
//!
//! One descriptor per slot in the thread table. The layout is `repr(C)`
//! because the context-switch trampoline receives raw pointers to the
//! descriptor and its save area.

use crate::types::{ThreadState, Tick};

/// Callee-saved register image kept outside the thread's stack
///
/// The trampoline stores r4-r11 here on the way out of a thread and reloads
/// them on the way back in. `lr` holds the exception-return value used to
/// resume the thread.
#[repr(C)]
pub struct SaveArea {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    /// Exception-return (LR) image
    pub lr: u32,
}

impl SaveArea {
    pub const fn new() -> Self {
        SaveArea {
            r4: 0,
            r5: 0,
            r6: 0,
            r7: 0,
            r8: 0,
            r9: 0,
            r10: 0,
            r11: 0,
            lr: 0,
        }
    }
}

/// Thread descriptor
#[repr(C)]
pub struct ThreadDescriptor {
    /// Slot state
    pub flags: ThreadState,

    // ============ Stack ============
    /// First byte of the stack region; null for slot 0 (main stack)
    pub stack_base: *mut u8,
    /// Stack size in bytes
    pub stack_size: usize,
    /// Kernel allocated this stack and frees it on slot reuse
    pub stack_owned: bool,
    /// Top of stack at last preemption; stale while this thread is on the CPU
    pub sp: *mut u8,

    // ============ Trampoline save area ============
    /// Callee-saved registers, outside the stack frame
    pub save: SaveArea,

    // ============ Scheduling ============
    /// Tick budget per slice, stored as requested - 1
    pub ticks: Tick,
    /// One-shot boost; non-zero means "pick me next, with this budget"
    pub priority: Tick,
}

impl ThreadDescriptor {
    /// Create an empty descriptor
    pub const fn new() -> Self {
        ThreadDescriptor {
            flags: ThreadState::Empty,
            stack_base: core::ptr::null_mut(),
            stack_size: 0,
            stack_owned: false,
            sp: core::ptr::null_mut(),
            save: SaveArea::new(),
            ticks: 0,
            priority: 0,
        }
    }

    /// Check if the slot can host a new thread
    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self.flags, ThreadState::Empty | ThreadState::Ended)
    }

    /// Check if the thread is eligible for scheduling
    #[inline]
    pub fn is_running(&self) -> bool {
        self.flags == ThreadState::Running
    }
}

impl Default for ThreadDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for ThreadDescriptor {}
unsafe impl Sync for ThreadDescriptor {}
