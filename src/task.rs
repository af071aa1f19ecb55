//! Holds the [`Task`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU32, Ordering};

use critical_section::CriticalSection;

use crate::{
    StackPusher,
    frame::TaskContext,
    layout::{Stack, StackRegion},
};

/// The body of a task
///
/// Tasks never return - they are an infinite loop which calls
/// [`delay`](crate::delay) when it has nothing to do.
pub type TaskEntryFn = fn() -> !;

/// Whether the scheduler may pick a task
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum TaskState {
    /// May be selected to run (which is not the same as running right now)
    Ready,
    /// Waiting for the tick counter to reach the task's wake tick
    Blocked,
}

/// A Task Control Block: everything the scheduler knows about one task
///
/// These live in a `static` table, so all the mutable fields use interior
/// mutability. The stack pointer is only touched by frame initialisation and
/// by PendSV. The state and wake tick are shared between task context and the
/// SysTick handler, so changing them needs a [`CriticalSection`].
#[repr(C)]
pub struct Task {
    /// The saved stack pointer, while the task is not running
    stack: AtomicPtr<u32>,
    /// The tick at which a blocked task becomes ready again
    wake_tick: AtomicU32,
    /// Set while the task is [`TaskState::Blocked`]
    blocked: AtomicBool,
    /// Size of the task's stack region, in bytes
    stack_len: usize,
    entry_fn: TaskEntryFn,
}

impl Task {
    /// Create a new [`Task`] object, which will run on the given stack
    pub const fn new<const LEN: usize>(
        entry_fn: TaskEntryFn,
        stack: &'static Stack<LEN>,
    ) -> Task {
        Task::in_region(entry_fn, stack.region())
    }

    /// Create a new [`Task`] object, which will run in the given stack region
    ///
    /// Get the region from a [`StackLayout`](crate::StackLayout) slot.
    pub const fn in_region(entry_fn: TaskEntryFn, region: StackRegion) -> Task {
        Task {
            stack: AtomicPtr::new(region.top()),
            wake_tick: AtomicU32::new(0),
            blocked: AtomicBool::new(false),
            stack_len: region.len(),
            entry_fn,
        }
    }

    /// Get the current stack pointer for this task
    pub fn stack(&self) -> *mut u32 {
        self.stack.load(Ordering::Relaxed)
    }

    /// Set the current stack pointer for this task
    ///
    /// # Safety
    ///
    /// The task will execute using the stack given, so it must point to the
    /// last item in a valid Arm EABI stack, with a full saved context
    /// preceding it.
    pub(crate) unsafe fn set_stack(&self, new_stack: *mut u32) {
        self.stack.store(new_stack, Ordering::Relaxed)
    }

    /// Write the task's initial context into its stack
    ///
    /// Must be called while the stack pointer still points at the top of the
    /// task's stack region, i.e. before the task first runs.
    pub(crate) fn init_frame(&self) -> *mut u32 {
        // SAFETY: The stack region is reserved for this task and is big
        // enough, which `StackRegion` checked when it was made.
        let mut stack_pusher = unsafe { StackPusher::new(self.stack(), self.stack_len) };
        TaskContext::initial(self.entry_fn).push_onto(&mut stack_pusher);
        let sp = stack_pusher.current();
        // SAFETY: we just put a complete initial context below `sp`
        unsafe {
            self.set_stack(sp);
        }
        sp
    }

    /// Is this task ready, or blocked?
    pub fn state(&self) -> TaskState {
        if self.blocked.load(Ordering::Relaxed) {
            TaskState::Blocked
        } else {
            TaskState::Ready
        }
    }

    /// The tick at which this task wakes up
    ///
    /// Only meaningful while the task is [`TaskState::Blocked`].
    pub fn wake_tick(&self) -> u32 {
        self.wake_tick.load(Ordering::Relaxed)
    }

    /// Mark the task as blocked until the tick counter reaches `wake_tick`
    pub(crate) fn block_until(&self, _cs: CriticalSection, wake_tick: u32) {
        self.wake_tick.store(wake_tick, Ordering::Relaxed);
        self.blocked.store(true, Ordering::Relaxed);
    }

    /// Make the task ready again, if this is its wake tick
    ///
    /// Returns `true` if the task was woken.
    pub(crate) fn wake_if_due(&self, _cs: CriticalSection, now: u32) -> bool {
        if self.state() == TaskState::Blocked && self.wake_tick() == now {
            self.blocked.store(false, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

unsafe impl Sync for Task {}

impl core::fmt::Display for TaskState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TaskState::Ready => f.write_str("ready"),
            TaskState::Blocked => f.write_str("blocked"),
        }
    }
}


// End of File
