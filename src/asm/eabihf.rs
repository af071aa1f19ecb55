//! Armv7-M EABIHF code

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Scheduler, port, scheduler};

/// PendSV Handler for Armv7-M or Armv8-M Mainline EABIHF
///
/// Runs when something has pended PendSV, once every higher priority
/// exception is done. That makes it the one place tasks get switched.
///
/// On entry, we will find that xPSR, PC, LR, R12, R3, R2, R1 and R0 will have
/// been pushed onto the PSP, along with either the low FPU registers, or
/// space for the low FPU registers. We push the remaining registers, and
/// inspect LR to see if we also need to push the high FPU registers (because
/// LR is set by the hardware on exception entry to tell us the FPU state of
/// the task we interrupted). We pass the resulting stack pointer to
/// `switch_context`, and restore the task whose stack pointer it returns
/// (including the high FPU registers if required).
///
/// Naked, because nothing may be pushed to the stack, and no register that
/// holds task state may be used, before we have stacked it ourselves.
#[unsafe(no_mangle)]
#[unsafe(naked)]
unsafe extern "C" fn PendSV() {
    // NOTE: This code must NOT touch r4-r11 or s16-s31 until they are
    // stacked. It can ONLY touch r0-r3 and r12, because those registers were
    // stacked by the hardware on exception entry.

    core::arch::naked_asm!(r#"
    // Workaround https://github.com/rust-lang/rust/issues/127269
    .fpu vfpv3

    // r1 = &Scheduler
    ldr      r1, ={scheduler_ptr}
    ldr      r1, [r1]

    // r2 = scheduler.current_task
    ldr      r2, [r1, {current_task_offset}]

    // r0 = null, for when there is nothing to stack
    movs     r0, #0

    // if current task ID is -1, skip the stacking of the current task
    cmp      r2, #-1
    beq      1f

    //
    // Stack the current task
    //

    // r0 = where the hardware left the task's stack
    mrs      r0, psp

    // Did the task we just interrupted use the FPU? (i.e. is bit 4 clear in LR?)
    tst      lr, #0x10

    // If FPU was used, stack the high FPU registers. Armv7-M exception entry handled the low ones.
    it       eq
    vstmdbeq r0!, {{ s16 - s31 }}

    // Stack r4-r11 and EXC_RETURN below the hardware frame
    stmdb    r0!, {{ r4 - r11, lr }}

    //
    // Pick the next task
    //
    // r0 holds the saved stack pointer. We get the next one back in r0.
    //

    1:

    bl       {switch_context}

    // r0 is the next task's saved stack pointer. Unstack r4-r11 and
    // EXC_RETURN from it.
    ldmia    r0!, {{ r4 - r11, lr }}

    // Did the task we just resumed use the FPU? (i.e. is bit 4 clear in LR?)
    tst      lr, #0x10

    // If FPU was used, unstack the high FPU registers
    it       eq
    vldmiaeq r0!, {{ s16 - s31 }}

    // The task resumes with PSP just above its software frame
    msr      psp, r0

    // exception return, into the task
    bx       lr
    "#,
    scheduler_ptr = sym scheduler::SCHEDULER_PTR,
    current_task_offset = const Scheduler::CURRENT_TASK_OFFSET,
    switch_context = sym port::switch_context,
    );
}

// End of File
