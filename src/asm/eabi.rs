//! Armv7-M EABI code

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Scheduler, port, scheduler};

/// PendSV Handler for Armv7-M or Armv8-M Mainline EABI
///
/// Runs when something has pended PendSV, once every higher priority
/// exception is done. That makes it the one place tasks get switched.
///
/// On entry, we will find that xPSR, PC, LR, R12, R3, R2, R1 and R0 will have
/// been pushed onto the PSP. We push the remaining registers (which are as
/// the running task left them), plus the EXC_RETURN value in LR, and pass the
/// resulting stack pointer to `switch_context`. It hands back the stack
/// pointer of the next task, which we unstack in reverse. Exiting from this
/// function will cause the hardware to restore the rest, and so the new task
/// will resume.
///
/// Naked, because nothing may be pushed to the stack, and no register that
/// holds task state may be used, before we have stacked it ourselves.
#[unsafe(no_mangle)]
#[unsafe(naked)]
unsafe extern "C" fn PendSV() {
    // NOTE: This code must NOT touch r4-r11 until they are stacked. It can
    // ONLY touch r0-r3 and r12, because those registers were stacked by the
    // hardware on exception entry.

    core::arch::naked_asm!(r#"
    // r1 = &Scheduler
    ldr     r1, ={scheduler_ptr}
    ldr     r1, [r1]

    // r2 = scheduler.current_task
    ldr     r2, [r1, {current_task_offset}]

    // r0 = null, for when there is nothing to stack
    movs    r0, #0

    // if current task ID is -1, skip the stacking of the current task
    cmp     r2, #-1
    beq     1f

    //
    // Stack the current task
    //

    // r0 = where the hardware left the task's stack
    mrs     r0, psp

    // Stack r4-r11 and EXC_RETURN below the hardware frame
    stmdb   r0!, {{ r4 - r11, lr }}

    //
    // Pick the next task
    //
    // r0 holds the saved stack pointer. We get the next one back in r0.
    //

    1:

    bl      {switch_context}

    // r0 is the next task's saved stack pointer. Unstack r4-r11 and
    // EXC_RETURN from it.
    ldmia   r0!, {{ r4 - r11, lr }}

    // The task resumes with PSP just above its software frame
    msr     psp, r0

    // exception return, into the task
    bx      lr
    "#,
    scheduler_ptr = sym scheduler::SCHEDULER_PTR,
    current_task_offset = const Scheduler::CURRENT_TASK_OFFSET,
    switch_context = sym port::switch_context,
    );
}

// End of File
