//! The kernel's terminal state
//!
//! Nothing in the kernel recovers from a fault. The firmware's fault and
//! panic handlers call [`halt`], which records what went wrong and stops.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicU8, Ordering};

/// Why the system stopped
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
#[repr(u8)]
pub enum Fault {
    HardFault = 1,
    MemManage,
    BusFault,
    UsageFault,
    /// Software gave up, with a `panic!`
    Panic,
}

impl Fault {
    const ALL: [Fault; 5] = [
        Fault::HardFault,
        Fault::MemManage,
        Fault::BusFault,
        Fault::UsageFault,
        Fault::Panic,
    ];

    fn from_code(code: u8) -> Option<Fault> {
        Self::ALL.into_iter().find(|fault| *fault as u8 == code)
    }
}

impl core::fmt::Display for Fault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Fault::HardFault => "HardFault",
            Fault::MemManage => "MemManage",
            Fault::BusFault => "BusFault",
            Fault::UsageFault => "UsageFault",
            Fault::Panic => "Panic",
        };
        f.write_str(name)
    }
}

/// The first fault we halted on, or zero
static HALTED: AtomicU8 = AtomicU8::new(0);

/// Remember `fault` as the reason we stopped
///
/// Only the first one counts. Returns `false` if we had already stopped.
#[cfg_attr(not(target_os = "none"), allow(dead_code))]
fn record(fault: Fault) -> bool {
    critical_section::with(|_cs| {
        if HALTED.load(Ordering::Relaxed) == 0 {
            HALTED.store(fault as u8, Ordering::Relaxed);
            true
        } else {
            false
        }
    })
}

/// Has the system halted, and if so why?
pub fn halted() -> Option<Fault> {
    Fault::from_code(HALTED.load(Ordering::Relaxed))
}

/// Stop the system, because of `fault`
///
/// Logs the fault, masks interrupts (so no more ticks, and no more task
/// switches) and parks the core.
#[cfg(target_os = "none")]
pub fn halt(fault: Fault) -> ! {
    if record(fault) {
        error!("Exception : {}", fault);
    }
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for fault in Fault::ALL {
            assert_eq!(Fault::from_code(fault as u8), Some(fault));
        }
        assert_eq!(Fault::from_code(0), None);
        assert_eq!(Fault::from_code(6), None);
    }

    #[test]
    fn first_fault_is_the_one_we_keep() {
        assert_eq!(halted(), None);
        assert!(record(Fault::BusFault));
        assert!(!record(Fault::Panic));
        assert_eq!(halted(), Some(Fault::BusFault));
    }

    #[test]
    fn display_names() {
        assert_eq!(format!("Exception : {}", Fault::UsageFault), "Exception : UsageFault");
        assert_eq!(Fault::MemManage.to_string(), "MemManage");
    }
}

// End of File
