//! The run-queue selection policy
//!
//! Round-robin, no priorities. The idle task only runs when nothing else can.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// The slot that always holds the idle task
pub const IDLE_SLOT: usize = 0;

/// Pick the next task to run
///
/// Starting with the slot after `current`, look at up to `num_tasks` slots in
/// round-robin order and return the first one (other than idle) for which
/// `is_ready` says yes. The scan ends back on `current`, so a task that is
/// the only ready one gets picked again. If nothing is ready, we return the
/// idle slot.
pub fn select_next(current: usize, num_tasks: usize, is_ready: impl Fn(usize) -> bool) -> usize {
    for step in 1..=num_tasks {
        // do the wrap-around
        let idx = (current + step) % num_tasks;
        if idx != IDLE_SLOT && is_ready(idx) {
            // no sense in checking any more tasks
            return idx;
        }
    }
    IDLE_SLOT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(current: usize, ready: &[bool]) -> usize {
        select_next(current, ready.len(), |idx| ready[idx])
    }

    #[test]
    fn rotates_through_ready_tasks() {
        let ready = [true; 5];
        assert_eq!(pick(0, &ready), 1);
        assert_eq!(pick(1, &ready), 2);
        assert_eq!(pick(3, &ready), 4);
        // wraps past idle
        assert_eq!(pick(4, &ready), 1);
    }

    #[test]
    fn skips_blocked_tasks() {
        let ready = [true, true, false, false, true];
        assert_eq!(pick(1, &ready), 4);
        assert_eq!(pick(4, &ready), 1);
    }

    #[test]
    fn sole_ready_task_is_picked_again() {
        let ready = [true, false, false, true, false];
        assert_eq!(pick(3, &ready), 3);
        assert_eq!(pick(0, &ready), 3);
    }

    #[test]
    fn falls_back_to_idle() {
        let ready = [true, false, false, false, false];
        for current in 0..ready.len() {
            assert_eq!(pick(current, &ready), IDLE_SLOT);
        }
    }

    #[test]
    fn idle_is_never_picked_while_others_are_ready() {
        // Even if the idle slot is "ready", the scan does not stop on it
        let ready = [true, false, true, false, false];
        for current in 0..ready.len() {
            assert_eq!(pick(current, &ready), 2);
        }
    }

    #[test]
    fn every_ready_task_gets_a_turn() {
        let ready = [true, true, false, true, true, true, false, true];
        let num_tasks = ready.len();
        let mut current = 0;
        let mut seen = [0u32; 8];
        // Every window of `num_tasks` decisions visits every ready task
        for _ in 0..(num_tasks * 4) {
            current = pick(current, &ready);
            seen[current] += 1;
        }
        for (idx, is_ready) in ready.iter().enumerate() {
            if idx == IDLE_SLOT || !is_ready {
                assert_eq!(seen[idx], 0, "slot {idx}");
            } else {
                assert!(seen[idx] >= 4, "slot {idx} only ran {} times", seen[idx]);
            }
        }
    }
}

// End of File
