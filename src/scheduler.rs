//! Contains the [`Scheduler`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicPtr, AtomicU32, AtomicUsize, Ordering};

use critical_section::CriticalSection;

use crate::{
    Task,
    selector::{self, IDLE_SLOT},
    task::TaskState,
};

/// The location of our one and only [`Scheduler`] object.
///
/// We need this so that the free-standing PendSV and SysTick handlers know
/// where all our system state is.
pub(crate) static SCHEDULER_PTR: AtomicPtr<Scheduler> = AtomicPtr::new(core::ptr::null_mut());

/// Represents a Task
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskId(usize);

impl TaskId {
    /// Represents the Task ID we produce when no task has run yet
    const INVALID_ID: usize = usize::MAX;

    /// The idle task
    pub const IDLE: TaskId = TaskId(IDLE_SLOT);

    /// Is this the invalid Task ID?
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID_ID
    }

    /// Is this the idle task?
    pub const fn is_idle(self) -> bool {
        self.0 == IDLE_SLOT
    }

    /// The slot in the task table, if this is a valid ID
    pub const fn index(self) -> Option<usize> {
        if self.is_invalid() {
            None
        } else {
            Some(self.0)
        }
    }

    /// Create an invalid Task ID
    pub(crate) const fn invalid() -> TaskId {
        TaskId(Self::INVALID_ID)
    }
}

#[cfg(target_os = "none")]
impl defmt::Format for TaskId {
    fn format(&self, fmt: defmt::Formatter) {
        if self.is_invalid() {
            defmt::write!(fmt, "T---");
        } else {
            defmt::write!(fmt, "T{=usize:03}", self.0);
        }
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_invalid() {
            write!(fmt, "T---")
        } else {
            write!(fmt, "T{:03}", self.0)
        }
    }
}

/// A pre-emptive, tick-driven, round-robin scheduler
///
/// Slot 0 of the task list is the idle task. It never blocks, and only runs
/// when every other task is blocked.
///
/// The Arm hardware will push {xPSR, PC, LR, R12, R3, R2, R1, R0} to PSP when
/// an exception occurs. PendSV then pushes the rest (EXC_RETURN and R11 to
/// R4) and hands the resulting stack pointer to
/// [`switch_context`](Scheduler::switch_context).
#[repr(C)]
pub struct Scheduler {
    /// Which task is currently running
    current_task: AtomicUsize,
    /// A fixed, static list of all our tasks
    task_list: &'static [Task],
    /// Current tick count
    ticks: AtomicU32,
}

impl Scheduler {
    /// The offset, in bytes, to the `current_task` field
    #[cfg_attr(not(target_os = "none"), allow(dead_code))]
    pub(crate) const CURRENT_TASK_OFFSET: usize = core::mem::offset_of!(Scheduler, current_task);

    /// Build the scheduler
    ///
    /// The first task in the list is the idle task.
    pub const fn new(task_list: &'static [Task]) -> Scheduler {
        // Cannot schedule without at least an idle task
        assert!(!task_list.is_empty());
        Scheduler {
            current_task: AtomicUsize::new(TaskId::INVALID_ID),
            task_list,
            ticks: AtomicU32::new(0),
        }
    }

    /// Get the list of tasks we are scheduling
    pub fn tasks(&self) -> &'static [Task] {
        self.task_list
    }

    /// Write an initial context into every task's stack
    pub(crate) fn init_task_frames(&self) {
        for (task_idx, task) in self.task_list.iter().enumerate() {
            let old_stack_top = task.stack();
            let new_stack = task.init_frame();
            debug!(
                "Init task frame {=usize}, stack 0x{=usize:08x} -> 0x{=usize:08x}",
                task_idx,
                old_stack_top as usize,
                new_stack as usize
            );
        }
    }

    /// Call once per period of the tick timer
    ///
    /// Advances the tick count and makes ready any task whose wake tick has
    /// arrived. The caller should then request a context switch, so the
    /// tasks we woke get a look-in.
    pub(crate) fn sched_tick(&self) {
        critical_section::with(|cs| {
            let now = self.ticks.load(Ordering::Relaxed).wrapping_add(1);
            self.ticks.store(now, Ordering::Relaxed);
            trace!("Tick {=u32}", now);
            // idle never blocks, so does not need waking
            for (task_idx, task) in self.task_list.iter().enumerate().skip(1) {
                if task.wake_if_due(cs, now) {
                    trace!("- woke T{=usize:03}", task_idx);
                }
            }
        });
    }

    /// Block the current task for the given number of ticks
    ///
    /// Returns `true` if the caller should request a context switch. The idle
    /// task never blocks, and nothing happens before the first task runs. A
    /// delay of zero ticks does not block, but does ask for a switch, so the
    /// caller yields to the next ready task.
    pub(crate) fn block_current(&self, cs: CriticalSection, ticks: u32) -> bool {
        let task_id = self.current_task_id();
        let Some(task_idx) = task_id.index() else {
            return false;
        };
        if task_id.is_idle() {
            return false;
        }
        if ticks != 0 {
            let wake_tick = self.now().wrapping_add(ticks);
            trace!("- T{=usize:03} blocked until {=u32}", task_idx, wake_tick);
            self.task_list[task_idx].block_until(cs, wake_tick);
        }
        true
    }

    /// Perform a context switch
    ///
    /// Stores `saved_sp` as the stack pointer of the current task (unless no
    /// task has run yet, in which case it is ignored), picks the next task,
    /// makes it current and returns its saved stack pointer.
    pub(crate) fn switch_context(&self, saved_sp: *mut u32) -> *mut u32 {
        critical_section::with(|_cs| {
            let current = self.current_task_id();
            let scan_from = match current.index() {
                Some(task_idx) => {
                    // SAFETY: PendSV gives us the stack pointer it just saved
                    // the whole context of this task below.
                    unsafe {
                        self.task_list[task_idx].set_stack(saved_sp);
                    }
                    task_idx
                }
                // Nothing has run yet. Scanning from idle means slot 1 goes first.
                None => IDLE_SLOT,
            };
            let next = selector::select_next(scan_from, self.task_list.len(), |idx| {
                self.task_list[idx].state() == TaskState::Ready
            });
            self.current_task.store(next, Ordering::Relaxed);
            trace!("Switch {} -> T{=usize:03}", current, next);
            self.task_list[next].stack()
        })
    }

    /// Get current tick count
    pub fn now(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Get the current Task ID
    pub fn current_task_id(&self) -> TaskId {
        TaskId(self.current_task.load(Ordering::Relaxed))
    }

    /// Get the handle to the global scheduler
    pub(crate) fn get_scheduler() -> Option<&'static Scheduler> {
        // Get our stashed pointer
        let scheduler_ptr = SCHEDULER_PTR.load(Ordering::Acquire);
        // Are we intialised?
        if scheduler_ptr.is_null() {
            None
        } else {
            // SAFETY: Only `Scheduler::start` writes to [`SCHEDULER_PTR`] and it
            // always sets it to be a valid pointer to a `&'static Scheduler`.
            Some(unsafe { &*scheduler_ptr })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Stack;

    fn task_body() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    /// Build a scheduler with `num_tasks` slots (idle included) on the heap
    fn make_scheduler(num_tasks: usize) -> &'static Scheduler {
        let tasks: Vec<Task> = (0..num_tasks)
            .map(|_| {
                let stack: &'static Stack<512> = Box::leak(Box::new(Stack::<512>::new()));
                Task::new(task_body, stack)
            })
            .collect();
        let scheduler = Box::leak(Box::new(Scheduler::new(tasks.leak())));
        scheduler.init_task_frames();
        scheduler
    }

    /// Do what PendSV does: save the current stack, switch, return who runs
    fn switch(scheduler: &Scheduler) -> usize {
        let saved_sp = match scheduler.current_task_id().index() {
            Some(idx) => scheduler.tasks()[idx].stack(),
            None => core::ptr::null_mut(),
        };
        let new_sp = scheduler.switch_context(saved_sp);
        let current = scheduler.current_task_id().index().unwrap();
        assert_eq!(new_sp, scheduler.tasks()[current].stack());
        current
    }

    /// Do what `delay` does, from whichever task is current
    fn delay(scheduler: &Scheduler, ticks: u32) -> bool {
        critical_section::with(|cs| scheduler.block_current(cs, ticks))
    }

    #[test]
    fn task_id_formatting() {
        assert_eq!(format!("{}", TaskId(3)), "T003");
        assert_eq!(format!("{}", TaskId::invalid()), "T---");
        assert_eq!(TaskId::invalid().index(), None);
        assert!(TaskId::IDLE.is_idle());
    }

    #[test]
    fn first_switch_runs_slot_one() {
        let scheduler = make_scheduler(5);
        assert!(scheduler.current_task_id().is_invalid());
        assert_eq!(scheduler.now(), 0);
        assert_eq!(switch(scheduler), 1);
    }

    #[test]
    fn first_switch_with_only_idle_runs_idle() {
        let scheduler = make_scheduler(1);
        assert_eq!(switch(scheduler), IDLE_SLOT);
        assert_eq!(switch(scheduler), IDLE_SLOT);
    }

    #[test]
    fn switch_saves_outgoing_stack_pointer() {
        let scheduler = make_scheduler(3);
        assert_eq!(switch(scheduler), 1);
        let task = &scheduler.tasks()[1];
        // pretend the task pushed some more context before PendSV saved it
        let saved_sp = task.stack().wrapping_sub(4);
        scheduler.switch_context(saved_sp);
        assert_eq!(task.stack(), saved_sp);
        assert_eq!(scheduler.current_task_id(), TaskId(2));
    }

    #[test]
    fn delay_before_start_does_nothing() {
        let scheduler = make_scheduler(3);
        assert!(!delay(scheduler, 10));
        assert!(
            scheduler
                .tasks()
                .iter()
                .all(|task| task.state() == TaskState::Ready)
        );
    }

    #[test]
    fn delay_of_250_at_tick_10_wakes_at_260() {
        let scheduler = make_scheduler(2);
        assert_eq!(switch(scheduler), 1);
        for _ in 0..10 {
            scheduler.sched_tick();
            assert_eq!(switch(scheduler), 1);
        }
        assert_eq!(scheduler.now(), 10);

        assert!(delay(scheduler, 250));
        let task = &scheduler.tasks()[1];
        assert_eq!(task.state(), TaskState::Blocked);
        assert_eq!(task.wake_tick(), 260);
        assert_eq!(switch(scheduler), IDLE_SLOT);

        while scheduler.now() < 259 {
            scheduler.sched_tick();
            assert_eq!(task.state(), TaskState::Blocked);
            assert_eq!(switch(scheduler), IDLE_SLOT);
        }
        scheduler.sched_tick();
        assert_eq!(scheduler.now(), 260);
        assert_eq!(task.state(), TaskState::Ready);
        assert_eq!(switch(scheduler), 1);
    }

    #[test]
    fn zero_delay_yields_without_blocking() {
        let scheduler = make_scheduler(4);
        assert_eq!(switch(scheduler), 1);
        assert!(delay(scheduler, 0));
        assert_eq!(scheduler.tasks()[1].state(), TaskState::Ready);
        assert_eq!(switch(scheduler), 2);
        assert!(delay(scheduler, 0));
        assert_eq!(switch(scheduler), 3);
        assert!(delay(scheduler, 0));
        assert_eq!(switch(scheduler), 1);
    }

    #[test]
    fn idle_never_blocks() {
        let scheduler = make_scheduler(2);
        assert_eq!(switch(scheduler), 1);
        assert!(delay(scheduler, 100));
        assert_eq!(switch(scheduler), IDLE_SLOT);
        // now running as idle
        assert!(!delay(scheduler, 5));
        assert_eq!(scheduler.tasks()[IDLE_SLOT].state(), TaskState::Ready);
        assert_eq!(switch(scheduler), IDLE_SLOT);
    }

    #[test]
    fn all_blocked_falls_back_to_idle() {
        let scheduler = make_scheduler(5);
        for expected in 1..5 {
            assert_eq!(switch(scheduler), expected);
            assert!(delay(scheduler, 50));
        }
        assert_eq!(switch(scheduler), IDLE_SLOT);
        for _ in 1..50 {
            scheduler.sched_tick();
            assert_eq!(switch(scheduler), IDLE_SLOT);
        }
        // everyone wakes on tick 50
        scheduler.sched_tick();
        assert_eq!(switch(scheduler), 1);
    }

    #[test]
    fn ready_tasks_share_time_slices() {
        let scheduler = make_scheduler(4);
        let mut seen = [0u32; 4];
        for _ in 0..30 {
            scheduler.sched_tick();
            seen[switch(scheduler)] += 1;
        }
        assert_eq!(seen, [0, 10, 10, 10]);
    }

    #[test]
    fn blinky_periods_over_two_seconds() {
        // Each task spends its whole period blocked, then runs once
        const PERIODS: [u32; 5] = [0, 1000, 500, 250, 125];
        let scheduler = make_scheduler(PERIODS.len());
        let mut selected = [0u32; 5];
        let mut wake_at = [0u32; 5];

        // Run every task that is ready until only idle is left
        let run_until_idle = |selected: &mut [u32; 5], wake_at: &mut [u32; 5]| {
            loop {
                let current = switch(scheduler);
                if current == IDLE_SLOT {
                    break;
                }
                assert!(scheduler.now() >= wake_at[current], "T{current} ran early");
                selected[current] += 1;
                wake_at[current] = scheduler.now() + PERIODS[current];
                assert!(delay(scheduler, PERIODS[current]));
            }
        };

        run_until_idle(&mut selected, &mut wake_at);
        for _ in 1..2000 {
            scheduler.sched_tick();
            run_until_idle(&mut selected, &mut wake_at);
        }

        assert_eq!(selected, [0, 2, 4, 8, 16]);
        assert_eq!(selected[4], 8 * selected[1]);
    }
}

// End of File
