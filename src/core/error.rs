//! Error types
//!
//! Uses Rust's Result pattern instead of the sentinel integers of classic
//! threading libraries.

/// Kernel error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OsError {
    /// No error
    None = 0,

    // ============ Thread errors ============
    /// All thread slots are in use
    NoFreeSlot = 101,
    /// Id out of range or slot never used
    InvalidThread = 102,
    /// Requested stack is smaller than the minimum
    StackTooSmall = 103,
    /// Stack allocation failed
    OutOfMemory = 104,

    // ============ Timer errors ============
    /// Interval timer bring-up failed
    TimerInit = 201,

    // ============ Timeout ============
    /// Deadline passed without the condition holding
    Timeout = 301,
}

/// Result type alias for kernel operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == OsError::None
    }

    #[inline]
    pub fn is_err(self) -> bool {
        self != OsError::None
    }
}
