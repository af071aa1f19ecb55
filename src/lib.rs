//! # rondo
//!
//! A minimal pre-emptive, tick-driven, round-robin scheduler for Arm
//! Cortex-M.
//!
//! You give a [`Scheduler`] a fixed table of [`Task`]s, where slot 0 is the
//! idle task, and then [`Scheduler::start`] it. SysTick time-slices the
//! tasks, and a task that has nothing to do calls [`delay`].
//!
//! ```rust,ignore
//! static TASK_LIST: [rondo::Task; 2] = [
//!     rondo::Task::in_region(rondo::idle, rondo::StackLayout::BOARD.task_region(0)),
//!     rondo::Task::in_region(blink, rondo::StackLayout::BOARD.task_region(1)),
//! ];
//! static SCHEDULER: rondo::Scheduler = rondo::Scheduler::new(&TASK_LIST);
//! ```

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

#[cfg(target_os = "none")]
mod asm;
pub mod config;
mod fault;
mod frame;
mod layout;
#[cfg(target_os = "none")]
mod port;
mod scheduler;
pub mod selector;
mod stack_pusher;
mod task;

use core::cell::UnsafeCell;

pub use config::TickConfig;
#[cfg(target_os = "none")]
pub use fault::halt;
pub use fault::{Fault, halted};
pub use frame::{MIN_STACK_SIZE, TaskContext};
pub use layout::{Stack, StackLayout, StackRegion};
pub use scheduler::{Scheduler, TaskId};
use stack_pusher::StackPusher;
pub use task::{Task, TaskEntryFn, TaskState};

/// Delay the calling task for the given number of ticks
///
/// The task is blocked, and other tasks run, until the tick count has gone up
/// by `ticks`. A `delay(0)` lets the other ready tasks have a turn but does
/// not block. The idle task never blocks, so this does nothing if called
/// from idle, or before the scheduler has started.
pub fn delay(ticks: u32) {
    let Some(scheduler) = Scheduler::get_scheduler() else {
        return;
    };
    critical_section::with(|cs| {
        if scheduler.block_current(cs, ticks) {
            // This pends until we unmask interrupts. That's fine - we want
            // to be switched out anyway.
            #[cfg(target_os = "none")]
            port::request_switch();
        }
    });
}

/// Get the current time in ticks
///
/// Returns zero if the scheduler has not started.
pub fn now() -> u32 {
    Scheduler::get_scheduler().map_or(0, Scheduler::now)
}

/// Get the ID of the running task
pub fn task_id() -> TaskId {
    Scheduler::get_scheduler().map_or(TaskId::invalid(), Scheduler::current_task_id)
}

/// A task body for the idle slot
///
/// Just spins, waiting for the next tick.
pub fn idle() -> ! {
    loop {
        core::hint::spin_loop();
    }
}


// End of File
