//! Producer/consumer over a mutex-protected counter
//!
//! The producer increments a shared counter under the lock; the consumer
//! samples it under the same lock.

#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]

#[cfg(target_arch = "arm")]
mod demo {
    use core::alloc::{GlobalAlloc, Layout};

    use cortex_m_rt::entry;

    use cmthreads::{add_thread_with_stack, delay, start, yield_now, Mutex};

    const CORE_HZ: u32 = 16_000_000;

    // ============ Demo heap ============

    /// This demo creates every thread on a static stack; the allocator
    /// exists only because the kernel can also own stacks.
    struct NoHeap;

    #[global_allocator]
    static HEAP: NoHeap = NoHeap;

    unsafe impl GlobalAlloc for NoHeap {
        unsafe fn alloc(&self, _layout: Layout) -> *mut u8 {
            core::ptr::null_mut()
        }
        unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {}
    }

    // ============ Shared state ============

    static LOCK: Mutex = Mutex::new();
    static mut COUNTER: u32 = 0;

    static mut PRODUCER_STK: [u8; 1024] = [0; 1024];
    static mut CONSUMER_STK: [u8; 1024] = [0; 1024];

    fn producer(_: *mut ()) {
        for _ in 0..1000 {
            LOCK.lock(0).ok();
            unsafe { COUNTER += 1 };
            LOCK.unlock();
            yield_now();
        }
    }

    fn consumer(_: *mut ()) {
        loop {
            if let Ok(_guard) = LOCK.lock_guard(0) {
                cmthreads::info!("counter={}", unsafe { COUNTER });
            }
            delay(50);
        }
    }

    // ============ Main ============

    #[entry]
    fn main() -> ! {
        cmthreads::init(CORE_HZ);

        add_thread_with_stack(producer, core::ptr::null_mut(), unsafe { &mut PRODUCER_STK })
            .expect("producer");
        add_thread_with_stack(consumer, core::ptr::null_mut(), unsafe { &mut CONSUMER_STK })
            .expect("consumer");

        start();

        loop {
            delay(1000);
        }
    }
}

// The demo only makes sense on a Cortex-M target.
#[cfg(not(target_arch = "arm"))]
fn main() {}
