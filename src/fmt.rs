//! Logging macros
//!
//! On the target these are `defmt`. On the host (where we run the unit tests)
//! there is no defmt logger to link against, so they only evaluate their
//! arguments.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

// Some levels are only used by the target-side code
#![allow(unused_macros)]

macro_rules! log_at {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(target_os = "none")]
        ::defmt::$level!($s $(, $x)*);
        #[cfg(not(target_os = "none"))]
        let _ = ($( &$x ),*);
    }};
}

macro_rules! trace {
    ($($t:tt)*) => { log_at!(trace, $($t)*) };
}

macro_rules! debug {
    ($($t:tt)*) => { log_at!(debug, $($t)*) };
}

macro_rules! info {
    ($($t:tt)*) => { log_at!(info, $($t)*) };
}

macro_rules! error {
    ($($t:tt)*) => { log_at!(error, $($t)*) };
}

// End of File
