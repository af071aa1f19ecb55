//! Common panic/fault/timestamp handlers for the demos

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

use defmt_semihosting as _;
use rondo::Fault;

/// Called when a panic occurs.
///
/// Logs the panic to defmt and then halts the system.
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    defmt::error!("PANIC: {}", defmt::Debug2Format(info));
    rondo::halt(Fault::Panic);
}

/// Called when a HardFault occurs.
///
/// Logs the stacked registers to defmt and then halts the system.
#[cortex_m_rt::exception]
unsafe fn HardFault(info: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::error!("FAULT: {}", defmt::Debug2Format(info));
    rondo::halt(Fault::HardFault);
}

#[cfg(not(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base")))]
#[cortex_m_rt::exception]
fn MemoryManagement() -> ! {
    rondo::halt(Fault::MemManage);
}

#[cfg(not(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base")))]
#[cortex_m_rt::exception]
fn BusFault() -> ! {
    rondo::halt(Fault::BusFault);
}

#[cfg(not(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base")))]
#[cortex_m_rt::exception]
fn UsageFault() -> ! {
    rondo::halt(Fault::UsageFault);
}

// Log scheduler ticks in the defmt logs
defmt::timestamp!("{=u32:010} {}", rondo::now(), rondo::task_id());

// End of File
