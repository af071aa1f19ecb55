//! Compile-time configuration for the kernel and the reference board

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// Scheduler tick rate, in Hz
pub const TICK_HZ: u32 = 1000;

/// Core clock feeding SysTick, in Hz (the 16 MHz HSI oscillator)
pub const CORE_CLOCK_HZ: u32 = 16_000_000;

/// Number of task slots, including the idle task in slot 0
pub const MAX_TASKS: usize = 5;

/// Size, in bytes, of each task's private stack
pub const TASK_STACK_SIZE: usize = 1024;

/// Size, in bytes, of the scheduler's own (handler mode) stack
pub const SCHED_STACK_SIZE: usize = 1024;

/// Start address of on-chip SRAM
pub const SRAM_START: usize = 0x2000_0000;

/// Size of on-chip SRAM, in bytes
pub const SRAM_SIZE: usize = 128 * 1024;

/// Describes how SysTick is programmed to produce the scheduler tick
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TickConfig {
    /// Frequency of the clock feeding SysTick
    pub core_clock_hz: u32,
    /// How many scheduler ticks we want per second
    pub tick_hz: u32,
}

impl TickConfig {
    /// The SysTick reload register is only 24 bits wide
    pub const MAX_RELOAD: u32 = 0x00FF_FFFF;

    /// A 1 kHz tick from the 16 MHz core clock
    pub const DEFAULT: TickConfig = TickConfig::new(CORE_CLOCK_HZ, TICK_HZ);

    /// Make a new tick configuration
    ///
    /// Fails (at compile time, if used in a `const`) if the resulting
    /// reload value does not fit in SysTick.
    pub const fn new(core_clock_hz: u32, tick_hz: u32) -> TickConfig {
        let config = TickConfig {
            core_clock_hz,
            tick_hz,
        };
        assert!(tick_hz != 0);
        let reload = config.reload();
        assert!(reload != 0 && reload <= Self::MAX_RELOAD);
        config
    }

    /// The value for the SysTick reload register
    ///
    /// SysTick counts from the reload value down to zero, so one period is
    /// `reload + 1` clock cycles.
    pub const fn reload(&self) -> u32 {
        (self.core_clock_hz / self.tick_hz).saturating_sub(1)
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        TickConfig::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_is_one_millisecond_of_hsi() {
        assert_eq!(TickConfig::DEFAULT.reload(), 15_999);
        assert_eq!(TickConfig::default(), TickConfig::new(16_000_000, 1000));
    }

    #[test]
    fn reload_scales_with_clock() {
        assert_eq!(TickConfig::new(64_000_000, 1000).reload(), 63_999);
        assert_eq!(TickConfig::new(16_000_000, 100).reload(), 159_999);
    }

    #[test]
    #[should_panic]
    fn reload_must_fit_in_24_bits() {
        let _ = TickConfig::new(u32::MAX, 1);
    }
}

// End of File
