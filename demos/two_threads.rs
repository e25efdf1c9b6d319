//! Two worker threads sharing the CPU with the main context
//!
//! Each worker bumps its own counter; the main thread watches both move.

#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]

#[cfg(target_arch = "arm")]
mod demo {
    use core::alloc::{GlobalAlloc, Layout};
    use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    use cortex_m_rt::entry;

    use cmthreads::{add_thread, delay, start};

    const CORE_HZ: u32 = 16_000_000;

    // ============ Demo heap ============

    const ARENA_SIZE: usize = 8192;

    /// Bump allocator over a static arena; backs the kernel-allocated
    /// thread stacks. Nothing in this demo ever frees.
    struct BumpAlloc {
        next: AtomicUsize,
    }

    static mut ARENA: [u8; ARENA_SIZE] = [0; ARENA_SIZE];

    #[global_allocator]
    static HEAP: BumpAlloc = BumpAlloc {
        next: AtomicUsize::new(0),
    };

    unsafe impl GlobalAlloc for BumpAlloc {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let base = &raw mut ARENA as *mut u8 as usize;
            let mut ptr = core::ptr::null_mut();
            let _ = self
                .next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                    let start = (base + next + layout.align() - 1) & !(layout.align() - 1);
                    let end = start - base + layout.size();
                    if end > ARENA_SIZE {
                        return None;
                    }
                    ptr = start as *mut u8;
                    Some(end)
                });
            ptr
        }

        unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {}
    }

    // ============ Workers ============

    static COUNT_A: AtomicU32 = AtomicU32::new(0);
    static COUNT_B: AtomicU32 = AtomicU32::new(0);

    fn worker_a(_: *mut ()) {
        loop {
            COUNT_A.fetch_add(1, Ordering::Relaxed);
            delay(100);
        }
    }

    fn worker_b(_: *mut ()) {
        loop {
            COUNT_B.fetch_add(1, Ordering::Relaxed);
            delay(150);
        }
    }

    // ============ Main ============

    #[entry]
    fn main() -> ! {
        cmthreads::init(CORE_HZ);

        add_thread(worker_a, core::ptr::null_mut(), 0).expect("worker a");
        add_thread(worker_b, core::ptr::null_mut(), 0).expect("worker b");

        start();
        cmthreads::info!("threading started");

        loop {
            delay(1000);
            cmthreads::info!(
                "a={} b={}",
                COUNT_A.load(Ordering::Relaxed),
                COUNT_B.load(Ordering::Relaxed)
            );
        }
    }
}

// The demo only makes sense on a Cortex-M target.
#[cfg(not(target_arch = "arm"))]
fn main() {}
