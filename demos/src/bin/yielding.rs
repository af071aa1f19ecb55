//! An example with three tasks that hand over to each other as fast as they can

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use rondo::{Scheduler, Stack, Task, TickConfig};

use rondo_demos as _;

static SCHEDULER: Scheduler = Scheduler::new({
    static TASK_LIST: [Task; 4] = [
        Task::new(rondo::idle, {
            static STACK: Stack<1024> = Stack::new();
            &STACK
        }),
        Task::new(rabbits, {
            static STACK: Stack<1024> = Stack::new();
            &STACK
        }),
        Task::new(hamsters, {
            static STACK: Stack<1024> = Stack::new();
            &STACK
        }),
        Task::new(cats, {
            static STACK: Stack<1024> = Stack::new();
            &STACK
        }),
    ];
    &TASK_LIST
});

#[cortex_m_rt::entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    defmt::info!("Hello!");
    SCHEDULER.start(cp.SYST, cp.SCB, TickConfig::DEFAULT);
}

/// Our 'rabbit' task
fn rabbits() -> ! {
    loop {
        defmt::info!("Rabbit!");
        rondo::delay(0);
    }
}

/// Our 'hamster' task
fn hamsters() -> ! {
    loop {
        defmt::info!("Hamster!");
        rondo::delay(0);
    }
}

/// Our 'cat' task
fn cats() -> ! {
    loop {
        defmt::info!("Cat!");
        rondo::delay(0);
    }
}

// End of File
