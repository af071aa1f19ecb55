//! Four blinking LEDs, each at its own rate
//!
//! Where the board would drive an LED we log with defmt instead. The task
//! stacks are carved out of the top of SRAM, at fixed addresses.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use rondo::{Scheduler, StackLayout, Task, TickConfig};

use rondo_demos as _;

const LAYOUT: StackLayout = StackLayout::BOARD;

static TASK_LIST: [Task; 5] = [
    Task::in_region(rondo::idle, LAYOUT.task_region(0)),
    Task::in_region(green, LAYOUT.task_region(1)),
    Task::in_region(orange, LAYOUT.task_region(2)),
    Task::in_region(red, LAYOUT.task_region(3)),
    Task::in_region(blue, LAYOUT.task_region(4)),
];

static SCHEDULER: Scheduler = Scheduler::new(&TASK_LIST);

#[cortex_m_rt::entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    defmt::info!("Hello!");

    // The linker script must leave the task stacks alone
    let msp = cortex_m::register::msp::read() as usize;
    defmt::assert!(
        msp <= LAYOUT.scheduler_stack_top() && msp > LAYOUT.scheduler_stack_bottom(),
        "MSP {=usize:08x} is not on the scheduler stack",
        msp
    );

    SCHEDULER.start(cp.SYST, cp.SCB, TickConfig::DEFAULT);
}

/// Toggle a (pretend) LED every `period` ticks
fn blink(led: &'static str, period: u32) -> ! {
    loop {
        defmt::info!("{=str} on", led);
        rondo::delay(period);
        defmt::info!("{=str} off", led);
        rondo::delay(period);
    }
}

/// LED 1, once a second
fn green() -> ! {
    blink("green", 1000)
}

fn orange() -> ! {
    blink("orange", 500)
}

fn red() -> ! {
    blink("red", 250)
}

/// LED 4, eight times as fast as LED 1
fn blue() -> ! {
    blink("blue", 125)
}

// End of File
