//! Where task stacks live: the [`StackLayout`], [`StackRegion`] and [`Stack`] types
//!
//! Stacks can either be carved out of the top of SRAM at fixed addresses
//! (using a [`StackLayout`]), or be ordinary statics placed by the linker
//! (using a [`Stack`]). Either way a task is handed a [`StackRegion`].

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{UnsafeCell, config, frame::MIN_STACK_SIZE};

/// A block of memory a task may use as its full-descending stack
#[derive(Copy, Clone, Debug)]
pub struct StackRegion {
    /// One past the highest byte of the region
    top: *mut u32,
    /// Size of the region, in bytes
    len: usize,
}

impl StackRegion {
    /// Get the top of the stack
    pub const fn top(&self) -> *mut u32 {
        self.top
    }

    /// Get the size of the stack, in bytes
    pub const fn len(&self) -> usize {
        self.len
    }
}

/// A fixed partition of the top of SRAM into task stacks and a scheduler stack
///
/// Going down from the end of SRAM we have task slot 1, slot 2 and so on up
/// to the last slot, then the idle task (slot 0), then the scheduler's own
/// stack. Everything below that is left for the linker.
///
/// ```text
/// ram_end   +-----------+
///           |  slot 1   |
///           +-----------+
///           |    ...    |
///           +-----------+
///           |  slot N-1 |
///           +-----------+
///           |  slot 0   |  (idle)
///           +-----------+
///           | scheduler |  (MSP)
///           +-----------+
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StackLayout {
    ram_end: usize,
    task_stack_size: usize,
    sched_stack_size: usize,
    task_slots: usize,
}

impl StackLayout {
    /// The layout of the reference board
    pub const BOARD: StackLayout = StackLayout::new(
        config::SRAM_START,
        config::SRAM_SIZE,
        config::TASK_STACK_SIZE,
        config::SCHED_STACK_SIZE,
        config::MAX_TASKS,
    );

    /// Describe a stack partition
    ///
    /// Stack sizes must be multiples of 8 (to keep every stack top AAPCS
    /// aligned), task stacks must hold at least one saved context, and the
    /// whole partition must fit in RAM. Anything else fails the build, when
    /// used in a `const`.
    pub const fn new(
        ram_start: usize,
        ram_size: usize,
        task_stack_size: usize,
        sched_stack_size: usize,
        task_slots: usize,
    ) -> StackLayout {
        assert!(task_slots >= 1);
        assert!(ram_start.is_multiple_of(8) && ram_size.is_multiple_of(8));
        assert!(task_stack_size.is_multiple_of(8) && sched_stack_size.is_multiple_of(8));
        assert!(task_stack_size >= MIN_STACK_SIZE);
        assert!(task_slots * task_stack_size + sched_stack_size <= ram_size);
        StackLayout {
            ram_end: ram_start + ram_size,
            task_stack_size,
            sched_stack_size,
            task_slots,
        }
    }

    /// How many task slots (including idle) this layout holds
    pub const fn task_slots(&self) -> usize {
        self.task_slots
    }

    /// The address one past the top of the stack for the given slot
    pub const fn task_stack_top(&self, slot: usize) -> usize {
        assert!(slot < self.task_slots);
        // How many stacks sit between this one and the end of RAM
        let above = if slot == 0 {
            self.task_slots - 1
        } else {
            slot - 1
        };
        self.ram_end - (above * self.task_stack_size)
    }

    /// The lowest address of the stack for the given slot
    pub const fn task_stack_bottom(&self, slot: usize) -> usize {
        self.task_stack_top(slot) - self.task_stack_size
    }

    /// The stack region for the given slot, ready to hand to a
    /// [`Task`](crate::Task)
    pub const fn task_region(&self, slot: usize) -> StackRegion {
        StackRegion {
            top: self.task_stack_top(slot) as *mut u32,
            len: self.task_stack_size,
        }
    }

    /// The initial main stack pointer, which the scheduler runs on
    pub const fn scheduler_stack_top(&self) -> usize {
        self.ram_end - (self.task_slots * self.task_stack_size)
    }

    /// The lowest address the scheduler stack is allowed to reach
    pub const fn scheduler_stack_bottom(&self) -> usize {
        self.scheduler_stack_top() - self.sched_stack_size
    }
}

/// A task stack placed by the linker, with the given size `LEN` bytes.
///
/// The value of `LEN` must be a multiple of 8 and at least
/// [`MIN_STACK_SIZE`], which is checked with an assert.
///
/// We align stacks on 8-byte boundaries, as required by AAPCS.
#[repr(align(8))]
pub struct Stack<const LEN: usize> {
    /// The memory reserved for the task stack
    contents: UnsafeCell<[u8; LEN]>,
}

impl<const LEN: usize> Stack<LEN> {
    /// Create a new stack
    pub const fn new() -> Self {
        assert!(LEN.is_multiple_of(8));
        assert!(LEN >= MIN_STACK_SIZE);
        Self {
            contents: UnsafeCell::new([0u8; LEN]),
        }
    }

    /// Get the top of the stack
    pub const fn top(&self) -> *mut u32 {
        // SAFETY: Pointing one past this object is allowed, as this is full
        // descending stack and we never write to the 'top' address - only
        // below it
        unsafe { self.contents.get().add(1) as *mut u32 }
    }

    /// Get the region this stack covers
    pub const fn region(&self) -> StackRegion {
        StackRegion {
            top: self.top(),
            len: LEN,
        }
    }
}

/// SAFETY: Our stack object only exposes pointers to itself, so is thread-safe
/// despite containing an `UnsafeCell`.
unsafe impl<const LEN: usize> Sync for Stack<LEN> {}

impl<const LEN: usize> Default for Stack<LEN> {
    fn default() -> Self {
        Stack::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_layout_matches_memory_map() {
        let layout = StackLayout::BOARD;
        assert_eq!(layout.task_stack_top(1), 0x2002_0000);
        assert_eq!(layout.task_stack_top(2), 0x2001_FC00);
        assert_eq!(layout.task_stack_top(3), 0x2001_F800);
        assert_eq!(layout.task_stack_top(4), 0x2001_F400);
        assert_eq!(layout.task_stack_top(0), 0x2001_F000);
        assert_eq!(layout.scheduler_stack_top(), 0x2001_EC00);
        assert_eq!(layout.scheduler_stack_bottom(), 0x2001_E800);
    }

    #[test]
    fn regions_do_not_overlap() {
        let layout = StackLayout::new(0x2000_0000, 64 * 1024, 512, 2048, 7);
        let mut ranges: Vec<(usize, usize)> = (0..layout.task_slots())
            .map(|slot| (layout.task_stack_bottom(slot), layout.task_stack_top(slot)))
            .collect();
        ranges.push((layout.scheduler_stack_bottom(), layout.scheduler_stack_top()));
        ranges.sort();
        for pair in ranges.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "{pair:x?} overlap");
        }
        for (bottom, top) in ranges {
            let expected = if bottom == layout.scheduler_stack_bottom() {
                2048
            } else {
                512
            };
            assert_eq!(top - bottom, expected);
            assert!(top.is_multiple_of(8));
        }
    }

    #[test]
    fn region_matches_slot() {
        let region = StackLayout::BOARD.task_region(3);
        assert_eq!(region.top() as usize, 0x2001_F800);
        assert_eq!(region.len(), 1024);
    }

    #[test]
    #[should_panic]
    fn partition_must_fit_in_ram() {
        let _ = StackLayout::new(0x2000_0000, 4096, 1024, 1024, 4);
    }

    #[test]
    fn linker_placed_stack_region() {
        static STACK: Stack<512> = Stack::new();
        let region = STACK.region();
        assert_eq!(region.len(), 512);
        assert_eq!(region.top(), STACK.top());
        assert!((region.top() as usize).is_multiple_of(8));
    }
}

// End of File
