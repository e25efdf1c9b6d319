//! Core type definitions
//!
//! Strong types for thread and scheduler state. Both enums travel through
//! the context-switch ABI, so their representations are fixed.

/// Thread slot index; a thread's identity for the lifetime of one use
pub type ThreadId = usize;

/// Tick counter type
pub type Tick = u32;

/// Thread entry point. Receives the argument passed to `add_thread`.
/// Returning is allowed: the initial frame's link register points at the
/// kernel's exit shim.
pub type ThreadFn = fn(*mut ());

/// Per-slot thread state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ThreadState {
    /// Slot has never held a thread
    Empty = 0,
    /// Eligible for scheduling
    Running = 1,
    /// Finished; slot reusable, stack freed on reuse
    Ended = 2,
    /// Not eligible until restarted
    Suspended = 3,
}

impl ThreadState {
    /// Decode a raw state word; unknown values read as `Empty`
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => ThreadState::Running,
            2 => ThreadState::Ended,
            3 => ThreadState::Suspended,
            _ => ThreadState::Empty,
        }
    }
}

/// Whether context switches are permitted
///
/// Stored in the `current_active` static read by the trampoline, hence the
/// fixed `i32` representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SchedulerState {
    /// Tick fires but the trampoline declines to switch
    Stopped = 0,
    /// Switching on every tick and yield
    Started = 1,
    /// Boot state: set until the first switch away from the main context
    FirstRun = 2,
}

impl SchedulerState {
    /// Decode the raw `current_active` word
    #[inline]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => SchedulerState::Started,
            2 => SchedulerState::FirstRun,
            _ => SchedulerState::Stopped,
        }
    }
}
