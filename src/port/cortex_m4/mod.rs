//! Cortex-M port implementation
//!
//! Interrupt handlers, tick timers and the yield SVCs. The register
//! save/restore itself is not expressible in Rust and lives in an external
//! assembly routine; this module owns the kernel's side of that contract.
//!
//! # Trampoline ABI
//!
//! The link step must provide four symbols:
//!
//! * `context_switch` - tick-driven entry, reached by branch from the
//!   SysTick handler below with the interrupted thread's frame intact.
//! * `context_switch_direct` - SVC-driven entry, switches unconditionally.
//! * `context_switch_direct_active` - as above; used by the SVC that has
//!   already set scheduling active.
//! * `context_switch_pit_isr` - interval-timer entry; acknowledges the
//!   timer through `context_timer_flag` before switching.
//!
//! Every entry first consults `current_active`: a stopped scheduler means
//! return immediately (`context_switch_direct_active` is exempt - its SVC
//! has just set the state). The tick entries additionally decrement
//! `current_tick_count` and return while it is still positive; the direct
//! entries switch without touching the budget. A switch then: saves r4-r11
//! and LR into the outgoing save area (skipped on the first run, when
//! there is no outgoing context and the state moves on to started),
//! publishes the outgoing stack pointer in `current_sp`, calls
//! `load_next_thread`, reloads r4-r11/LR from `current_save_area`, sets
//! the stack pointer from `current_sp` (main stack iff
//! `current_use_main_stack` is set) and exception-returns so the CPU pops
//! the incoming frame.

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;

use crate::config::CFG_TICK_RATE_HZ;
use crate::error::{OsError, OsResult};
use crate::kernel::{current_active, current_use_systick, systick_millis_count};

/// SVC immediate: perform a direct context switch now
pub const SVC_YIELD: u8 = 0x00;

/// SVC immediate: set scheduling active, then switch
pub const SVC_YIELD_ACTIVE: u8 = 0x01;

/// Interval-timer acknowledge register, published for the trampoline
#[no_mangle]
#[allow(non_upper_case_globals)]
pub static mut context_timer_flag: *mut u32 = core::ptr::null_mut();

/// Arm the system tick at [`CFG_TICK_RATE_HZ`]
///
/// The tick and the SVC run at the lowest exception priority so a switch
/// never tears another interrupt's state.
pub fn systick_init(core_hz: u32) {
    let mut p = unsafe { cortex_m::Peripherals::steal() };

    unsafe {
        p.SCB.set_priority(SystemHandler::SysTick, 0xF0);
        p.SCB.set_priority(SystemHandler::SVCall, 0xF0);
    }

    p.SYST.set_reload(core_hz / CFG_TICK_RATE_HZ - 1);
    p.SYST.clear_current();
    p.SYST.set_clock_source(SystClkSource::Core);
    p.SYST.enable_interrupt();
    p.SYST.enable_counter();
}

/// Request an immediate context switch
#[inline(always)]
pub fn yield_svc() {
    unsafe { asm!("svc {n}", n = const SVC_YIELD) };
}

/// Set scheduling active and switch
#[inline(always)]
pub fn yield_and_start_svc() {
    unsafe { asm!("svc {n}", n = const SVC_YIELD_ACTIVE) };
}

/// Park the CPU until the next interrupt
#[inline(always)]
pub fn idle() {
    cortex_m::asm::wfi();
}

/// Data memory barrier
///
/// Required after mutex state mutations so a preemption immediately after
/// a wake-up observes it.
#[inline(always)]
pub fn dmb() {
    cortex_m::asm::dmb();
}

/// System tick handler
///
/// Advances the millisecond clock unconditionally, then hands over to the
/// trampoline while the system tick is the switch source. Naked so the
/// interrupted thread's registers and stack survive the branch; the
/// trampoline itself honors a stopped scheduler.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn SysTick() {
    naked_asm!(
        "ldr r0, ={millis}",
        "ldr r1, [r0]",
        "adds r1, r1, #1",
        "str r1, [r0]",
        "ldr r0, ={use_systick}",
        "ldr r0, [r0]",
        "cbz r0, 1f",
        "b context_switch",
        "1:",
        "bx lr",
        millis = sym systick_millis_count,
        use_systick = sym current_use_systick,
    );
}

/// Supervisor call handler
///
/// Digs the SVC immediate out of the caller's stacked frame and routes the
/// two yield flavors to their trampoline entries. Anything else returns
/// untouched.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn SVCall() {
    naked_asm!(
        "tst lr, #4",
        "ite eq",
        "mrseq r0, msp",
        "mrsne r0, psp",
        // Stacked PC is frame word 6; the immediate lives in the low byte
        // of the svc instruction two bytes before it.
        "ldr r1, [r0, #24]",
        "ldrb r1, [r1, #-2]",
        "cmp r1, #0x01",
        "beq 2f",
        "cmp r1, #0x00",
        "beq 1f",
        "bx lr",
        "1:",
        "b context_switch_direct",
        "2:",
        "ldr r0, ={active}",
        "movs r1, #1",
        "str r1, [r0]",
        "b context_switch_direct_active",
        active = sym current_active,
    );
}

/// Bring up the microsecond interval timer as the switch source
///
/// TIM2 is clocked down to 1 MHz, reloads every `us` microseconds, and is
/// unmasked at the lowest interrupt priority so it cannot interrupt other
/// interrupts. Its vector branches into the trampoline's interval-timer
/// entry.
#[cfg(feature = "pac")]
pub fn micro_timer_init(us: u32) -> OsResult<()> {
    use stm32_metapac as pac;

    if us == 0 {
        return Err(OsError::TimerInit);
    }

    pac::RCC.apb1enr().modify(|w| w.set_tim2en(true));

    let tim = pac::TIM2;
    tim.cr1().modify(|w| w.set_cen(false));
    tim.psc().write(|w| w.set_psc((crate::config::CFG_TIMER_CLOCK_HZ / 1_000_000 - 1) as u16));
    tim.arr().write(|w| w.set_arr(us - 1));
    tim.cnt().write(|w| w.set_cnt(0));
    tim.egr().write(|w| w.set_ug(true));
    tim.sr().modify(|w| w.set_uif(false));

    unsafe {
        context_timer_flag = tim.sr().as_ptr() as *mut u32;

        let mut p = cortex_m::Peripherals::steal();
        p.NVIC.set_priority(pac::Interrupt::TIM2, 0xF0);
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM2);
    }

    tim.dier().modify(|w| w.set_uie(true));
    tim.cr1().modify(|w| w.set_cen(true));
    Ok(())
}

/// Without a PAC there is no interval timer to program
#[cfg(not(feature = "pac"))]
pub fn micro_timer_init(_us: u32) -> OsResult<()> {
    Err(OsError::TimerInit)
}

/// Interval timer vector: straight into the trampoline
#[cfg(feature = "pac")]
#[no_mangle]
#[unsafe(naked)]
unsafe extern "C" fn TIM2() {
    naked_asm!("b context_switch_pit_isr");
}
