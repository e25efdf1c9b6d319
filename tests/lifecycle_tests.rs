//! Host tests for the thread lifecycle against the global table
//!
//! The whole sequence lives in one test so the fixed slot table is driven
//! from a known state throughout; cargo runs separate test functions
//! concurrently and the table is process-global.

use cmthreads::config::CFG_MAX_THREADS;
use cmthreads::error::OsError;
use cmthreads::types::ThreadState;
use cmthreads::{
    add_thread, delay, get_state, id, kill, millis, restart, set_priority, set_state,
    stack_remaining, stack_used, suspend, wait,
};

fn noop(_: *mut ()) {}

#[test]
fn slot_allocation_reuse_and_introspection() {
    // The caller's context is slot 0.
    assert_eq!(id(), 0);

    // ============ Slot allocation ============

    // Undersized stacks are rejected before a slot is consumed.
    assert_eq!(
        add_thread(noop, core::ptr::null_mut(), 64),
        Err(OsError::StackTooSmall)
    );

    // Seven free slots behind slot 0; ids are handed out lowest-first.
    let mut ids = [0usize; CFG_MAX_THREADS - 1];
    for (n, slot) in ids.iter_mut().enumerate() {
        *slot = add_thread(noop, core::ptr::null_mut(), 0).expect("slot should be free");
        assert_eq!(*slot, n + 1);
    }

    // Table is full now.
    assert_eq!(
        add_thread(noop, core::ptr::null_mut(), 0),
        Err(OsError::NoFreeSlot)
    );

    // ============ Slot reuse ============

    kill(3).unwrap();
    assert_eq!(get_state(3), Ok(ThreadState::Ended));

    // The ended slot is the lowest free one and gets reused.
    assert_eq!(add_thread(noop, core::ptr::null_mut(), 0), Ok(3));
    assert_eq!(get_state(3), Ok(ThreadState::Running));

    // ============ State transitions ============

    suspend(2).unwrap();
    assert_eq!(get_state(2), Ok(ThreadState::Suspended));
    restart(2).unwrap();
    assert_eq!(get_state(2), Ok(ThreadState::Running));
    assert_eq!(set_state(2, ThreadState::Suspended), Ok(ThreadState::Suspended));
    restart(2).unwrap();

    set_priority(5, 20).unwrap();

    // ============ Bounds checks ============

    assert_eq!(kill(CFG_MAX_THREADS), Err(OsError::InvalidThread));
    assert_eq!(suspend(999), Err(OsError::InvalidThread));
    assert_eq!(get_state(999), Err(OsError::InvalidThread));
    assert_eq!(wait(999, 10), Err(OsError::InvalidThread));
    assert_eq!(set_priority(999, 1), Err(OsError::InvalidThread));

    // ============ Stack introspection ============

    // Fresh threads have consumed exactly the bootstrap frame; used and
    // remaining partition the stack.
    let used = stack_used(1).unwrap();
    let remaining = stack_remaining(1).unwrap();
    assert!(used > 0);
    assert_eq!(used + remaining, 1024);

    // ============ wait() ============

    // A non-Running target returns immediately.
    kill(4).unwrap();
    assert_eq!(wait(4, 0), Ok(4));

    // A Running target is only left by timeout; the host yield stub
    // advances the clock.
    assert_eq!(wait(1, 20), Err(OsError::Timeout));

    // ============ delay() ============

    let before = millis();
    delay(10);
    assert!(millis().wrapping_sub(before) >= 10);

    // ============ Cleanup ============

    for slot in 1..CFG_MAX_THREADS {
        let _ = kill(slot);
    }
}
