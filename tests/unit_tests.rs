//! Unit tests for the portable kernel core
//!
//! These run on the host (not an embedded target) to verify the core
//! algorithms and layouts work correctly.

#[cfg(test)]
mod frame_tests {
    use cmthreads::port::frame::{init_stack, InterruptFrame, EXC_RETURN_THREAD_PSP};
    use cmthreads::config::CFG_STK_ALIGN;

    fn entry(_: *mut ()) {}

    #[test]
    fn bootstrap_frame_round_trips_entry_and_argument() {
        let mut stack = [0u8; 512];
        let base = stack.as_mut_ptr();
        let arg = 0x1234usize as *mut ();

        let sp = unsafe { init_stack(entry, arg, base, stack.len()) };

        // The returned sp is the bottom of the synthetic frame.
        let frame = unsafe { &*(sp as *const InterruptFrame) };
        assert_eq!(frame.r0, 0x1234);
        assert_eq!(frame.r1, 0);
        assert_eq!(frame.r2, 0);
        assert_eq!(frame.r3, 0);
        assert_eq!(frame.r12, 0);
        assert_eq!(frame.pc, entry as usize as u32);
        assert_eq!(frame.xpsr, 0x0100_0000);
        assert_ne!(frame.lr, 0);
    }

    #[test]
    fn bootstrap_frame_is_aligned_and_in_bounds() {
        let mut stack = [0u8; 512];
        let base = stack.as_mut_ptr();

        let sp = unsafe { init_stack(entry, core::ptr::null_mut(), base, stack.len()) };

        assert_eq!(sp as usize % CFG_STK_ALIGN, 0);
        assert!(sp as usize >= base as usize);
        // Frame plus the 8-byte gap fit below the top of the region.
        let frame_end = sp as usize + core::mem::size_of::<InterruptFrame>();
        assert!(frame_end + 8 <= base as usize + stack.len());
    }

    #[test]
    fn exception_return_image_targets_thread_mode_psp() {
        assert_eq!(EXC_RETURN_THREAD_PSP, 0xFFFF_FFFD);
    }
}

#[cfg(test)]
mod critical_tests {
    use cmthreads::critical::CriticalSection;
    use cmthreads::types::SchedulerState;

    #[test]
    fn nested_guards_restore_the_outer_prior_state() {
        let outer = CriticalSection::enter();
        {
            let inner = CriticalSection::enter();
            // The outer guard already stopped scheduling.
            assert_eq!(inner.prior_state(), SchedulerState::Stopped);
        }
        // Inner drop put Stopped back; outer drop restores its own saved
        // state, whatever the system was doing before.
        drop(outer);
    }
}

#[cfg(test)]
mod error_tests {
    use cmthreads::error::OsError;

    #[test]
    fn test_error_variants() {
        assert!(OsError::None.is_ok());
        assert!(!OsError::None.is_err());

        assert!(!OsError::Timeout.is_ok());
        assert!(OsError::Timeout.is_err());

        assert_eq!(OsError::None, OsError::None);
        assert_ne!(OsError::None, OsError::Timeout);
    }

    #[test]
    fn test_error_debug() {
        // Ensure errors can be formatted for debugging
        let err = OsError::NoFreeSlot;
        let _ = format!("{:?}", err);
    }
}

#[cfg(test)]
mod types_tests {
    use cmthreads::types::*;

    #[test]
    fn test_thread_state_raw_round_trip() {
        assert_eq!(ThreadState::from_raw(ThreadState::Running as u32), ThreadState::Running);
        assert_eq!(ThreadState::from_raw(ThreadState::Ended as u32), ThreadState::Ended);
        assert_eq!(ThreadState::from_raw(ThreadState::Suspended as u32), ThreadState::Suspended);
        // Unknown values decode as Empty
        assert_eq!(ThreadState::from_raw(0xFFFF), ThreadState::Empty);
    }

    #[test]
    fn test_scheduler_state_raw_round_trip() {
        assert_eq!(SchedulerState::from_raw(0), SchedulerState::Stopped);
        assert_eq!(SchedulerState::from_raw(1), SchedulerState::Started);
        assert_eq!(SchedulerState::from_raw(2), SchedulerState::FirstRun);
        assert_eq!(SchedulerState::from_raw(-5), SchedulerState::Stopped);
    }
}

#[cfg(test)]
mod config_tests {
    use cmthreads::config::*;

    #[test]
    fn test_config_values() {
        assert!(CFG_MAX_THREADS >= 2, "Need the main slot plus one thread");
        assert!(CFG_MAX_THREADS <= 64, "Table scan assumes a small table");

        assert!(CFG_STK_SIZE_MIN >= 128, "Stack too small for a frame plus call depth");
        assert!(CFG_DEFAULT_STACK_SIZE >= CFG_STK_SIZE_MIN);

        assert!(CFG_TICK_RATE_HZ >= 10, "Tick rate too slow");
        assert!(CFG_TICK_RATE_HZ <= 10000, "Tick rate too fast");

        assert!(CFG_STK_ALIGN.is_power_of_two());
    }
}
