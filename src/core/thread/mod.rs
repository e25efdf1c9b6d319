//! Thread lifecycle management
//!
//! Creation, teardown and control of threads in the fixed slot table.
//! Slot 0 belongs to the context that initialized the kernel and is never
//! handed out.

mod descriptor;

pub use descriptor::{SaveArea, ThreadDescriptor};

use alloc::alloc::{alloc, dealloc};
use core::alloc::Layout;

use crate::config::{CFG_MAX_THREADS, CFG_STK_ALIGN, CFG_STK_SIZE_MIN};
use crate::critical::{critical_section, CriticalSection};
use crate::error::{OsError, OsResult};
use crate::kernel::{self, THREADS};
use crate::port;
use crate::types::{SchedulerState, ThreadFn, ThreadId, ThreadState, Tick};

/// Layout for a kernel-owned stack
///
/// # Safety
/// `size` must be non-zero; the alignment is a valid power of two.
#[inline]
unsafe fn stack_layout(size: usize) -> Layout {
    unsafe { Layout::from_size_align_unchecked(size, CFG_STK_ALIGN) }
}

/// Create a thread on a kernel-allocated stack
///
/// `stack_size == 0` selects the configured default. The argument is handed
/// to `entry` in r0 on first dispatch; if `entry` returns, the thread ends
/// and its slot becomes reusable.
///
/// # Errors
/// * [`OsError::NoFreeSlot`] - every slot holds a live thread
/// * [`OsError::OutOfMemory`] - stack allocation failed
/// * [`OsError::StackTooSmall`] - requested size below the minimum
pub fn add_thread(entry: ThreadFn, arg: *mut (), stack_size: usize) -> OsResult<ThreadId> {
    add_thread_raw(entry, arg, stack_size, core::ptr::null_mut())
}

/// Create a thread on a caller-provided stack
///
/// The buffer must outlive the thread; the kernel never frees it.
pub fn add_thread_with_stack(
    entry: ThreadFn,
    arg: *mut (),
    stack: &'static mut [u8],
) -> OsResult<ThreadId> {
    add_thread_raw(entry, arg, stack.len(), stack.as_mut_ptr())
}

fn add_thread_raw(
    entry: ThreadFn,
    arg: *mut (),
    stack_size: usize,
    stack_ptr: *mut u8,
) -> OsResult<ThreadId> {
    let prev;
    let result;
    {
        let cs = CriticalSection::enter();
        prev = cs.prior_state();
        let table = THREADS.get(&cs);

        result = (|| {
            let size = if stack_size == 0 {
                table.default_stack_size
            } else {
                stack_size
            };
            if size < CFG_STK_SIZE_MIN {
                return Err(OsError::StackTooSmall);
            }

            for i in 1..CFG_MAX_THREADS {
                if !table.thread[i].is_free() {
                    continue;
                }

                // A previous occupant's kernel-owned stack is only safe to
                // free now: the dying thread kept executing on it until the
                // switch away.
                if table.thread[i].stack_owned && !table.thread[i].stack_base.is_null() {
                    unsafe {
                        dealloc(table.thread[i].stack_base, stack_layout(table.thread[i].stack_size));
                    }
                    table.thread[i].stack_base = core::ptr::null_mut();
                    table.thread[i].stack_owned = false;
                }

                let (base, owned) = if stack_ptr.is_null() {
                    // SAFETY: size is at least CFG_STK_SIZE_MIN
                    let p = unsafe { alloc(stack_layout(size)) };
                    if p.is_null() {
                        return Err(OsError::OutOfMemory);
                    }
                    (p, true)
                } else {
                    (stack_ptr, false)
                };

                let default_ticks = table.default_ticks;
                let d = &mut table.thread[i];
                d.stack_base = base;
                d.stack_size = size;
                d.stack_owned = owned;
                // SAFETY: base..base+size is writable and large enough for
                // the initial frame.
                d.sp = unsafe { port::frame::init_stack(entry, arg, base, size) };
                d.ticks = default_ticks;
                d.priority = 0;
                d.save = SaveArea::new();
                d.save.lr = port::frame::EXC_RETURN_THREAD_PSP;
                d.flags = ThreadState::Running;

                table.count += 1;
                return Ok(i);
            }
            Err(OsError::NoFreeSlot)
        })();
    }

    // The guard restored the prior state; a system that was live before the
    // call goes (back) to Started so the new thread is dispatched.
    if result.is_ok()
        && matches!(prev, SchedulerState::Started | SchedulerState::FirstRun)
    {
        kernel::start();
    }
    result
}

fn transition(id: ThreadId, state: ThreadState) -> OsResult<()> {
    critical_section(|cs| {
        let d = THREADS.get(cs).checked_mut(id)?;
        if d.flags == ThreadState::Empty {
            return Err(OsError::InvalidThread);
        }
        d.flags = state;
        Ok(())
    })
}

/// End a thread. Its stack stays allocated until the slot is reused; the
/// thread may still be on the CPU until the next tick.
pub fn kill(id: ThreadId) -> OsResult<()> {
    transition(id, ThreadState::Ended)
}

/// Make a thread ineligible for scheduling until [`restart`]ed
pub fn suspend(id: ThreadId) -> OsResult<()> {
    transition(id, ThreadState::Suspended)
}

/// Make a thread eligible for scheduling again
pub fn restart(id: ThreadId) -> OsResult<()> {
    transition(id, ThreadState::Running)
}

/// Read a slot's state
pub fn get_state(id: ThreadId) -> OsResult<ThreadState> {
    critical_section(|cs| THREADS.get(cs).checked(id).map(|d| d.flags))
}

/// Overwrite a slot's state. The caller takes responsibility for the
/// transition making sense.
pub fn set_state(id: ThreadId, state: ThreadState) -> OsResult<ThreadState> {
    transition(id, state)?;
    Ok(state)
}

/// One-shot priority boost: the scheduler picks `id` at its next selection
/// (if Running) with `level` as the tick budget, then clears the boost.
pub fn set_priority(id: ThreadId, level: Tick) -> OsResult<()> {
    critical_section(|cs| {
        let d = THREADS.get(cs).checked_mut(id)?;
        if d.flags == ThreadState::Empty {
            return Err(OsError::InvalidThread);
        }
        d.priority = level;
        Ok(())
    })
}

/// Spin-yield until `id` leaves the Running state
///
/// `timeout_ms == 0` waits forever. Returns the id once the thread has
/// ended or suspended.
pub fn wait(id: ThreadId, timeout_ms: u32) -> OsResult<ThreadId> {
    if id >= CFG_MAX_THREADS {
        return Err(OsError::InvalidThread);
    }
    let start = crate::time::millis();
    loop {
        if timeout_ms != 0 && crate::time::millis().wrapping_sub(start) > timeout_ms {
            return Err(OsError::Timeout);
        }
        match get_state(id)? {
            ThreadState::Empty => return Err(OsError::InvalidThread),
            ThreadState::Running => {}
            _ => return Ok(id),
        }
        yield_now();
    }
}

/// Give up the rest of this slice: request an immediate context switch
#[inline]
pub fn yield_now() {
    port::yield_svc();
}

/// Like [`yield_now`], but the switch also sets scheduling active
///
/// Used on wake-up paths that must guarantee the handoff happens even if
/// scheduling was stopped around them.
#[inline]
pub fn yield_and_start() {
    port::yield_and_start_svc();
}

/// Slot index of the calling thread
pub fn id() -> ThreadId {
    critical_section(|cs| THREADS.get(cs).current)
}

/// Set the default stack size for subsequently created threads
pub fn set_default_stack_size(bytes: usize) {
    critical_section(|cs| THREADS.get(cs).default_stack_size = bytes);
}

/// Bytes of stack consumed by `id`, measured at its last preemption
///
/// Meaningful only for threads other than the caller; the running thread's
/// saved `sp` is stale.
pub fn stack_used(id: ThreadId) -> OsResult<usize> {
    critical_section(|cs| {
        let d = THREADS.get(cs).checked(id)?;
        if d.flags == ThreadState::Empty {
            return Err(OsError::InvalidThread);
        }
        Ok(d.stack_base as usize + d.stack_size - d.sp as usize)
    })
}

/// Bytes of stack left below `id`'s last saved `sp`
pub fn stack_remaining(id: ThreadId) -> OsResult<usize> {
    critical_section(|cs| {
        let d = THREADS.get(cs).checked(id)?;
        if d.flags == ThreadState::Empty {
            return Err(OsError::InvalidThread);
        }
        Ok(d.sp as usize - d.stack_base as usize)
    })
}

/// Exit shim: the link-register target of every initial thread frame
///
/// Runs on the dying thread's stack, so the stack cannot be freed here;
/// reuse of the slot frees it. The loop stalls until the next tick switches
/// away, after which the slot is never selected again.
pub(crate) fn thread_exit() -> ! {
    {
        let cs = CriticalSection::enter();
        let table = THREADS.get(&cs);
        let me = table.current;
        table.thread[me].flags = ThreadState::Ended;
        table.count = table.count.saturating_sub(1);
    }
    loop {
        port::idle();
    }
}
