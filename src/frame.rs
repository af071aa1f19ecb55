//! Holds the [`TaskContext`] type, which describes a switched-out task's stack
//!
//! When a task is not running, the top of its stack holds its complete
//! register file. From the lowest address upwards:
//!
//! ```text
//! sp ->  r4 r5 r6 r7 r8 r9 r10 r11 EXC_RETURN   <- stored by PendSV
//!        r0 r1 r2 r3 r12 lr pc xPSR             <- stored by the hardware
//! ```
//!
//! The saved `stack_pointer` in a [`Task`](crate::Task) always points at the
//! saved `r4`.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{StackPusher, task::TaskEntryFn};

/// The value of the Processor Status Register when a task starts
///
/// The only bit we need to set is the T bit, to indicate that the task
/// should run in Thumb mode (the only supported mode on M-profile). The
/// exception number field is zero, meaning Thread mode.
pub const INITIAL_XPSR: u32 = 1 << 24;

/// The EXC_RETURN value for a fresh task
///
/// Return to Thread mode, on the Process Stack, with a basic frame (no
/// floating-point state to unstack).
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// Words stored by the hardware on exception entry
pub const HARDWARE_FRAME_WORDS: usize = 8;

/// Words stored by our PendSV handler, below the hardware frame
pub const SOFTWARE_FRAME_WORDS: usize = 9;

/// Total size of a basic saved context, in words
pub const FRAME_WORDS: usize = HARDWARE_FRAME_WORDS + SOFTWARE_FRAME_WORDS;

/// This is the minimum stack we can support, because of the state we need to push
///
/// Make space for the seventeen 32-bit words of saved task state, plus some
/// headroom
#[cfg(not(arm_abi = "eabihf"))]
pub const MIN_STACK_SIZE: usize = (4 * FRAME_WORDS) + 8;

/// This is the minimum stack we can support, because of the state we need to push
///
/// Make space for the seventeen 32-bit words of integer task state, the
/// sixteen callee-saved FPU registers, the eighteen words of the hardware
/// FPU frame, plus some headroom
#[cfg(arm_abi = "eabihf")]
pub const MIN_STACK_SIZE: usize = (4 * (FRAME_WORDS + 16 + 18)) + 8;

/// The full register state of a task that is not running
///
/// The field order is the in-memory order of the saved frame, lowest address
/// first, so a saved stack pointer can be viewed as one of these.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskContext {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    /// The EXC_RETURN value PendSV will branch to when resuming this task
    pub exc_return: u32,
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

const _: () = assert!(core::mem::size_of::<TaskContext>() == FRAME_WORDS * 4);

impl TaskContext {
    /// The context a task has before it first runs
    ///
    /// Resumes at `entry` in Thread mode on the process stack, with every
    /// general purpose register (and `lr`) zeroed.
    pub fn initial(entry: TaskEntryFn) -> TaskContext {
        TaskContext {
            exc_return: EXC_RETURN_THREAD_PSP,
            // Exception return wants a halfword aligned PC, without the
            // interworking bit that function pointers carry.
            pc: (entry as usize as u32) & !1,
            xpsr: INITIAL_XPSR,
            ..TaskContext::default()
        }
    }

    /// Push this context onto a stack, in the order PendSV will unstack it
    pub(crate) fn push_onto(&self, stack_pusher: &mut StackPusher) {
        // Standard Arm exception frame
        stack_pusher.push(self.xpsr);
        stack_pusher.push(self.pc);
        stack_pusher.push(self.lr);
        stack_pusher.push(self.r12);
        stack_pusher.push(self.r3);
        stack_pusher.push(self.r2);
        stack_pusher.push(self.r1);
        stack_pusher.push(self.r0);

        // Additional task state we persist
        stack_pusher.push(self.exc_return);
        stack_pusher.push(self.r11);
        stack_pusher.push(self.r10);
        stack_pusher.push(self.r9);
        stack_pusher.push(self.r8);
        stack_pusher.push(self.r7);
        stack_pusher.push(self.r6);
        stack_pusher.push(self.r5);
        stack_pusher.push(self.r4);
    }

    /// Read back the context saved at a task stack pointer
    ///
    /// # Safety
    ///
    /// `sp` must be a saved task stack pointer, with a full frame above it.
    pub unsafe fn read(sp: *const u32) -> TaskContext {
        unsafe { sp.cast::<TaskContext>().read_volatile() }
    }

    /// Returns true if every general purpose register and `lr` is zero
    pub fn registers_zeroed(&self) -> bool {
        [
            self.r0, self.r1, self.r2, self.r3, self.r4, self.r5, self.r6, self.r7, self.r8,
            self.r9, self.r10, self.r11, self.r12, self.lr,
        ]
        .iter()
        .all(|r| *r == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Stack;

    fn spin() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    #[test]
    fn initial_frame_resumes_at_entry_with_zeroed_registers() {
        static STACK: Stack<256> = Stack::new();
        let mut pusher = unsafe { StackPusher::new(STACK.top(), 256) };
        TaskContext::initial(spin).push_onto(&mut pusher);

        let sp = pusher.current();
        assert_eq!(STACK.top() as usize - sp as usize, FRAME_WORDS * 4);

        let ctx = unsafe { TaskContext::read(sp) };
        assert_eq!(ctx.pc, (spin as usize as u32) & !1);
        assert_eq!(ctx.xpsr, 0x0100_0000);
        assert_eq!(ctx.exc_return, 0xFFFF_FFFD);
        assert!(ctx.registers_zeroed());
    }

    #[test]
    fn frame_words_are_in_unstacking_order() {
        static STACK: Stack<256> = Stack::new();
        let mut pusher = unsafe { StackPusher::new(STACK.top(), 256) };
        let ctx = TaskContext::initial(spin);
        ctx.push_onto(&mut pusher);

        let words =
            unsafe { core::slice::from_raw_parts(pusher.current() as *const u32, FRAME_WORDS) };
        // r4-r11 first, as popped by `ldmia r0!, {r4-r11, lr}`
        assert_eq!(&words[0..8], &[0u32; 8]);
        assert_eq!(words[8], EXC_RETURN_THREAD_PSP);
        // then the hardware frame: r0-r3, r12, lr, pc, xPSR
        assert_eq!(&words[9..15], &[0u32; 6]);
        assert_eq!(words[15], ctx.pc);
        assert_eq!(words[16], INITIAL_XPSR);
    }

    #[test]
    fn saved_context_restores_unchanged() {
        static STACK: Stack<256> = Stack::new();
        let before = TaskContext {
            r4: 4,
            r5: 5,
            r6: 6,
            r7: 7,
            r8: 8,
            r9: 9,
            r10: 10,
            r11: 11,
            exc_return: 0xFFFF_FFED,
            r0: 0xA0,
            r1: 0xA1,
            r2: 0xA2,
            r3: 0xA3,
            r12: 0xC0,
            lr: 0x0800_1235,
            pc: 0x0800_2000,
            xpsr: 0x2100_0000,
        };
        let mut pusher = unsafe { StackPusher::new(STACK.top(), 256) };
        before.push_onto(&mut pusher);
        let after = unsafe { TaskContext::read(pusher.current()) };
        assert_eq!(before, after);
    }
}

// End of File
