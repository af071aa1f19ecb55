//! Holds the [`StackPusher`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// A helper for pushing words into a full-descending Arm EABI stack
pub(crate) struct StackPusher {
    /// The last word written (or the top of the stack, if nothing was pushed)
    sp: *mut u32,
    /// The lowest address we are allowed to write to
    floor: *mut u32,
}

impl StackPusher {
    /// Make a new full-descending stack from the given pointer
    ///
    /// It will not write to `stack_top`, only the `len_bytes` immediately
    /// below it - because this is a Full Descending stack.
    ///
    /// # Safety
    ///
    /// The `len_bytes` below `stack_top` must be memory we own and nobody
    /// else is using.
    pub(crate) unsafe fn new(stack_top: *mut u32, len_bytes: usize) -> StackPusher {
        StackPusher {
            sp: stack_top,
            floor: stack_top.wrapping_byte_sub(len_bytes),
        }
    }

    /// Push a word onto the stack, moving the stack pointer down
    pub(crate) fn push(&mut self, value: u32) {
        debug_assert!(self.sp > self.floor, "stack overflow during frame init");
        // SAFETY: `new` guarantees the memory down to `floor` is ours, and we
        // just checked we are still above it
        unsafe {
            self.sp = self.sp.offset(-1);
            self.sp.write_volatile(value);
        }
    }

    /// Get the current stack pointer value
    pub(crate) fn current(&self) -> *mut u32 {
        self.sp
    }
}

// End of File
