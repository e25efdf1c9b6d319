//! Global kernel state and the context-switch ABI surface
//!
//! The thread table is touched from thread context only under a critical
//! section; the tick path goes through the unchecked accessor because the
//! interrupt is already atomic with respect to thread code on a single
//! core.
//!
//! The `current_*` statics below are the contract with the assembly
//! trampoline. Their names are part of the ABI and must not change.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use crate::config::{CFG_DEFAULT_STACK_SIZE, CFG_DEFAULT_TICKS, CFG_MAX_THREADS};
use crate::critical::{self, critical_section, CriticalSection};
use crate::error::{OsError, OsResult};
use crate::thread::{SaveArea, ThreadDescriptor};
use crate::types::{SchedulerState, ThreadId, ThreadState, Tick};

// ============ Thread Table ============

/// Fixed-capacity table of thread slots
///
/// `repr(C)` with the slot array first: the table's base address doubles as
/// the address of slot 0's descriptor, which the trampoline statics point
/// at until the first switch.
#[repr(C)]
pub struct ThreadTable {
    /// Thread slots; index 0 is the main context
    pub(crate) thread: [ThreadDescriptor; CFG_MAX_THREADS],
    /// Slot currently executing on the CPU
    pub(crate) current: usize,
    /// Number of live application threads (slot 0 excluded)
    pub(crate) count: usize,
    /// Tick budget given to newly created threads
    pub(crate) default_ticks: Tick,
    /// Stack size for kernel-allocated stacks when the caller passes none
    pub(crate) default_stack_size: usize,
}

impl ThreadTable {
    pub(crate) const fn new() -> Self {
        let mut table = ThreadTable {
            thread: [const { ThreadDescriptor::new() }; CFG_MAX_THREADS],
            current: 0,
            count: 0,
            default_ticks: CFG_DEFAULT_TICKS,
            default_stack_size: CFG_DEFAULT_STACK_SIZE,
        };
        // Slot 0 is the context that called into the kernel. It runs on the
        // main stack and never leaves the Running state.
        table.thread[0].flags = ThreadState::Running;
        table.thread[0].ticks = CFG_DEFAULT_TICKS;
        table
    }

    /// Bounds-checked slot access
    pub(crate) fn checked(&self, id: ThreadId) -> OsResult<&ThreadDescriptor> {
        self.thread.get(id).ok_or(OsError::InvalidThread)
    }

    /// Bounds-checked mutable slot access
    pub(crate) fn checked_mut(&mut self, id: ThreadId) -> OsResult<&mut ThreadDescriptor> {
        self.thread.get_mut(id).ok_or(OsError::InvalidThread)
    }
}

/// Interior-mutability cell holding the thread table
///
/// Thread-mode code unlocks it with the scheduler-halting guard; the tick
/// path uses the unchecked accessor.
pub(crate) struct TableCell(UnsafeCell<ThreadTable>);

unsafe impl Sync for TableCell {}

impl TableCell {
    const fn new(table: ThreadTable) -> Self {
        TableCell(UnsafeCell::new(table))
    }

    /// Get the table; holding the guard proves scheduling is halted
    #[inline(always)]
    pub(crate) fn get(&self, _cs: &CriticalSection) -> &mut ThreadTable {
        unsafe { &mut *self.0.get() }
    }

    /// Get the table without a guard
    ///
    /// # Safety
    /// Caller must be the tick interrupt, or must otherwise know that no
    /// context switch can observe the table mid-update.
    #[inline(always)]
    pub(crate) unsafe fn get_unchecked(&self) -> &mut ThreadTable {
        unsafe { &mut *self.0.get() }
    }
}

/// Global thread table instance
pub(crate) static THREADS: TableCell = TableCell::new(ThreadTable::new());

// ============ Context-Switch ABI ============
//
// Published state consumed by the external trampoline symbols
// (`context_switch`, `context_switch_direct`, `context_switch_direct_active`,
// `context_switch_pit_isr`). Integer flags are atomics so thread-mode Rust
// can touch them without `static mut`; their in-memory representation is a
// plain word, which is what the assembly loads and stores.

/// Whether switching is permitted: a raw [`SchedulerState`] value.
/// Boots in `FirstRun` so the first dispatch knows there is no thread
/// context to save.
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static current_active: AtomicI32 = AtomicI32::new(SchedulerState::FirstRun as i32);

/// Remaining tick budget of the running thread; the tick source decrements
/// it and switches when it reaches zero.
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static current_tick_count: AtomicI32 = AtomicI32::new(CFG_DEFAULT_TICKS as i32);

/// 1 while the system tick drives context switches, 0 once the
/// microsecond timer has taken over.
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static current_use_systick: AtomicI32 = AtomicI32::new(1);

/// 1 while the incoming thread is slot 0 (main stack), 0 otherwise.
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static current_use_main_stack: AtomicI32 = AtomicI32::new(1);

/// Descriptor of the thread being switched in
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static mut current_thread_desc: *mut ThreadDescriptor = core::ptr::null_mut();

/// Save area of the thread being switched in
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static mut current_save_area: *mut SaveArea = core::ptr::null_mut();

/// Stack pointer handoff slot: the trampoline publishes the outgoing sp
/// here before selection and reads the incoming sp from it afterwards.
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static mut current_sp: *mut u8 = core::ptr::null_mut();

/// Free-running millisecond counter, advanced by the system tick interrupt
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static systick_millis_count: AtomicU32 = AtomicU32::new(0);

// ============ Public API ============

/// Initialize the kernel and arm the system tick
///
/// Points the trampoline statics at slot 0 (the caller's context) and
/// starts the tick at [`CFG_TICK_RATE_HZ`](crate::config::CFG_TICK_RATE_HZ).
/// Must be called once, before [`start`] or any
/// [`add_thread`](crate::thread::add_thread).
pub fn init(core_hz: u32) {
    critical_section(|cs| {
        let table = THREADS.get(cs);
        unsafe {
            current_thread_desc = &mut table.thread[0];
            current_save_area = &mut table.thread[0].save;
            current_sp = core::ptr::null_mut();
        }
        current_use_main_stack.store(1, Ordering::Relaxed);
        current_tick_count.store(table.default_ticks as i32, Ordering::Relaxed);
    });
    crate::port::systick_init(core_hz);
}

/// Begin (or resume) preemptive scheduling. Returns the prior state.
pub fn start() -> SchedulerState {
    critical::start(SchedulerState::Started)
}

/// Halt scheduling. Returns the prior state for a later
/// [`critical::start`].
///
/// If threads are already running this should be used sparingly; the
/// scoped [`CriticalSection`](crate::critical::CriticalSection) restores
/// the state automatically.
pub fn stop() -> SchedulerState {
    critical::stop()
}

/// Current scheduler state
pub fn state() -> SchedulerState {
    SchedulerState::from_raw(current_active.load(Ordering::Relaxed))
}
