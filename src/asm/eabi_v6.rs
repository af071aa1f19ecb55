//! Armv6-M EABI code

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Scheduler, port, scheduler};

/// PendSV Handler for Armv6-M or Armv8-M Baseline EABI
///
/// Runs when something has pended PendSV, once every higher priority
/// exception is done. That makes it the one place tasks get switched. It uses only the Armv6-M
/// subset instructions, which cannot store the high registers directly, nor
/// store downwards. So we make room for the nine words first and then fill
/// them in going up, giving the same layout as the Armv7-M handler.
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
    movs    r3, #1
    cmn     r2, r3
    beq     1f

    //
    // Stack the current task
    //

    // r0 = the current task stack pointer, less room for r4-r11 and lr
    mrs     r0, psp
    subs    r0, #{software_frame_bytes}

    // r1 = where we are storing to
    mov     r1, r0

    // Store r4-r7, then r8-r11 by way of r4-r7, then lr
    stmia   r1!, {{ r4 - r7 }}
    mov     r4, r8
    mov     r5, r9
    mov     r6, r10
    mov     r7, r11
    stmia   r1!, {{ r4 - r7 }}
    mov     r4, lr
    stmia   r1!, {{ r4 }}

    //
    // Pick the next task
    //
    // r0 holds the saved stack pointer. We get the next one back in r0.
    //

    1:

    bl      {switch_context}

    // r8-r11 live 16 bytes up, with lr after them
    mov     r1, r0
    adds    r1, #16
    ldmia   r1!, {{ r4 - r7 }}
    mov     r8, r4
    mov     r9, r5
    mov     r10, r6
    mov     r11, r7
    ldmia   r1!, {{ r2 }}
    mov     lr, r2

    // Now r4-r7, from the bottom
    ldmia   r0!, {{ r4 - r7 }}

    // psp = the top of the software frame (where r1 ended up)
    msr     psp, r1

    // exception return, into the task
    bx      lr
    "#,
    scheduler_ptr = sym scheduler::SCHEDULER_PTR,
    current_task_offset = const Scheduler::CURRENT_TASK_OFFSET,
    software_frame_bytes = const crate::frame::SOFTWARE_FRAME_WORDS * 4,
    switch_context = sym port::switch_context,
    );
}

// End of File
