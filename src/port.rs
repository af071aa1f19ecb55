//! The Cortex-M specific parts of the kernel
//!
//! Starting the scheduler, the SysTick handler, and the Rust half of the
//! PendSV handler. The other half is in [`asm`](crate::asm).

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::Ordering;

use cortex_m::peripheral::{SCB, SYST, scb::SystemHandler, syst::SystClkSource};

use crate::{Scheduler, config::TickConfig, scheduler::SCHEDULER_PTR};

/// The priority we give PendSV: the lowest there is
const PENDSV_PRIORITY: u8 = 0xFF;

impl Scheduler {
    /// Run the scheduler
    ///
    /// You may only call this once, and you should call it from `fn main()`
    /// once all your hardware is configured. We should be in Privileged
    /// Thread mode on the Main stack, which becomes the stack for all our
    /// exception handlers.
    pub fn start(&'static self, mut syst: SYST, mut scb: SCB, tick: TickConfig) -> ! {
        if Scheduler::get_scheduler().is_some() {
            panic!("Tried to re-start scheduler!");
        }

        // remember where this object is, for the exception handlers
        let self_addr = self as *const Scheduler as *mut Scheduler;
        info!("Scheduler @ {=usize:08x}", self_addr as usize);
        SCHEDULER_PTR.store(self_addr, Ordering::Release);

        enable_fault_reporting(&mut scb);

        // SAFETY: We have not started switching tasks yet, so changing
        // exception priorities cannot break any running code.
        unsafe {
            scb.set_priority(SystemHandler::PendSV, PENDSV_PRIORITY);
        }

        // We need to push some empty state into each task stack
        self.init_task_frames();

        // Must do this /after/ setting SCHEDULER_PTR because the SysTick
        // exception handler will use SCHEDULER_PTR
        info!(
            "Tick at {=u32} Hz from {=u32} Hz, reload {=u32}",
            tick.tick_hz,
            tick.core_clock_hz,
            tick.reload()
        );
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(tick.reload());
        syst.clear_current();
        syst.enable_interrupt();
        syst.enable_counter();

        // Fire the PendSV exception - the PendSV handler will select a task
        // to run and run it
        debug!("Hit PendSV");
        request_switch();
        // flush the pipeline to ensure the PendSV fires before we reach the end of this function
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
        // impossible to get here
        unreachable!();
    }
}

/// MEMFAULTENA, BUSFAULTENA and USGFAULTENA in the SHCSR
#[cfg(not(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base")))]
const SHCSR_FAULT_ENABLES: u32 = (1 << 16) | (1 << 17) | (1 << 18);

/// Route memory, bus and usage faults to their own handlers
///
/// Armv6-M and Armv8-M Baseline do not have these, and everything is a
/// HardFault.
fn enable_fault_reporting(scb: &mut SCB) {
    #[cfg(not(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base")))]
    // SAFETY: Only sets the fault enable bits, leaving the rest as they were
    unsafe {
        scb.shcsr.modify(|shcsr| shcsr | SHCSR_FAULT_ENABLES);
    }
    #[cfg(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base"))]
    let _ = scb;
}

/// Ask for a context switch, once all other exceptions have finished
pub(crate) fn request_switch() {
    SCB::set_pendsv();
}

/// SysTick Handler
#[unsafe(no_mangle)]
extern "C" fn SysTick() {
    if let Some(scheduler) = Scheduler::get_scheduler() {
        scheduler.sched_tick();
        request_switch();
    }
}

/// Called by PendSV with the stack pointer of the task it just stacked
///
/// Returns the stack pointer of the task PendSV should unstack.
pub(crate) extern "C" fn switch_context(saved_sp: *mut u32) -> *mut u32 {
    match Scheduler::get_scheduler() {
        Some(scheduler) => scheduler.switch_context(saved_sp),
        None => panic!("PendSV before the scheduler started"),
    }
}

// End of File
