//! Scheduler module
//!
//! Round-robin selection over the thread table with a one-shot priority
//! boost. Selection runs inside the tick interrupt (or a yield SVC), after
//! the trampoline has parked the outgoing thread's stack pointer in
//! `current_sp`.

use core::sync::atomic::Ordering;

use crate::config::CFG_MAX_THREADS;
use crate::kernel::{
    self, current_save_area, current_sp, current_thread_desc, current_tick_count,
    current_use_main_stack,
};
use crate::types::{ThreadId, Tick};

impl kernel::ThreadTable {
    /// Select the next thread to run and return `(slot, tick_budget)`
    ///
    /// Policy, in order:
    /// 1. Boost scan: the first Running slot with a non-zero `priority`
    ///    wins. The boost is cleared and its value becomes the budget.
    /// 2. Round-robin: scan forward from `current + 1`, wrapping to slot 0
    ///    at the end of the table. Slot 0 is taken unconditionally on wrap;
    ///    it is the main context and the scan must terminate even while the
    ///    main thread is parked on a mutex.
    pub(crate) fn pick_next(&mut self) -> (ThreadId, Tick) {
        for i in 0..CFG_MAX_THREADS {
            if self.thread[i].priority != 0 && self.thread[i].is_running() {
                let budget = self.thread[i].priority;
                self.thread[i].priority = 0;
                self.current = i;
                return (i, budget);
            }
        }

        loop {
            self.current += 1;
            if self.current >= CFG_MAX_THREADS {
                self.current = 0;
                break;
            }
            if self.thread[self.current].is_running() {
                break;
            }
        }
        (self.current, self.thread[self.current].ticks)
    }
}

/// Scheduler entry invoked by the context-switch trampoline
///
/// On entry the outgoing thread's stack pointer has been published in
/// `current_sp`. Captures it into the outgoing descriptor, picks the next
/// thread and republishes the statics the trampoline restores from.
///
/// # Safety
/// Must only be called from the trampoline, which runs atomically with
/// respect to thread code.
#[no_mangle]
pub unsafe extern "C" fn load_next_thread() {
    // SAFETY: interrupt context; thread-mode mutators hold scheduling
    // stopped, and the trampoline does not reach this point while stopped.
    let table = unsafe { kernel::THREADS.get_unchecked() };

    let outgoing = table.current;
    table.thread[outgoing].sp = unsafe { current_sp };

    let (next, budget) = table.pick_next();

    current_tick_count.store(budget as i32, Ordering::Relaxed);
    current_use_main_stack.store((next == 0) as i32, Ordering::Relaxed);
    unsafe {
        current_thread_desc = &mut table.thread[next];
        current_save_area = &mut table.thread[next].save;
        current_sp = table.thread[next].sp;
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CFG_DEFAULT_TICKS, CFG_MAX_THREADS};
    use crate::kernel::ThreadTable;
    use crate::types::ThreadState;

    fn table_with_running(ids: &[usize]) -> ThreadTable {
        let mut table = ThreadTable::new();
        for &id in ids {
            table.thread[id].flags = ThreadState::Running;
            table.thread[id].ticks = CFG_DEFAULT_TICKS;
        }
        table
    }

    fn drive(table: &mut ThreadTable, steps: usize) -> alloc::vec::Vec<usize> {
        (0..steps).map(|_| table.pick_next().0).collect()
    }

    #[test]
    fn round_robin_visits_every_running_thread() {
        let mut table = table_with_running(&[1, 2, 3]);
        let order = drive(&mut table, 8);
        assert_eq!(order, [1, 2, 3, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn lone_main_thread_is_selected_every_tick() {
        let mut table = table_with_running(&[]);
        assert_eq!(drive(&mut table, 3), [0, 0, 0]);
    }

    #[test]
    fn skips_suspended_and_ended_slots() {
        let mut table = table_with_running(&[1, 2, 3]);
        table.thread[2].flags = ThreadState::Suspended;
        table.thread[3].flags = ThreadState::Ended;
        assert_eq!(drive(&mut table, 4), [1, 0, 1, 0]);
    }

    #[test]
    fn boost_is_one_shot_and_carries_its_budget() {
        let mut table = table_with_running(&[1, 2, 3, 4, 5, 6]);
        table.current = 4;
        table.thread[5].priority = 20;

        let (id, budget) = table.pick_next();
        assert_eq!(id, 5);
        assert_eq!(budget, 20);
        assert_eq!(table.thread[5].priority, 0);

        // After the boosted slice, round-robin resumes from slot 6.
        assert_eq!(table.pick_next().0, 6);
    }

    #[test]
    fn boost_ignores_non_running_candidates() {
        let mut table = table_with_running(&[1, 2]);
        table.thread[4].flags = ThreadState::Suspended;
        table.thread[4].priority = 9;
        table.current = 0;
        assert_eq!(table.pick_next().0, 1);
        assert_eq!(table.thread[4].priority, 9);
    }

    #[test]
    fn boost_beats_round_robin_order() {
        let mut table = table_with_running(&[1, 2, 3]);
        table.current = 0;
        table.thread[3].priority = 2;
        assert_eq!(table.pick_next().0, 3);
        assert_eq!(drive(&mut table, 3), [0, 1, 2]);
    }

    #[test]
    fn wrap_returns_to_main_even_when_suspended() {
        // The main thread may be parked on a mutex; the wrap still lands on
        // slot 0 so the scan terminates.
        let mut table = table_with_running(&[]);
        table.thread[0].flags = ThreadState::Suspended;
        assert_eq!(table.pick_next().0, 0);
    }

    #[test]
    fn round_robin_budget_comes_from_the_slot() {
        let mut table = table_with_running(&[1]);
        table.thread[1].ticks = 4;
        let (id, budget) = table.pick_next();
        assert_eq!((id, budget), (1, 4));
    }

    #[test]
    fn every_thread_runs_within_a_full_rotation() {
        let mut table = table_with_running(&[1, 2, 3, 4, 5, 6, 7]);
        let mut seen = [false; CFG_MAX_THREADS];
        for _ in 0..CFG_MAX_THREADS {
            seen[table.pick_next().0] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
