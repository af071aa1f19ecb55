//! Build script for rondo

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// Entry point to the build script
///
/// Emits the `arm_architecture` / `arm_abi` cfgs that pick the right
/// PendSV implementation. On a host target nothing is emitted, and only the
/// portable kernel logic is compiled.
fn main() {
    arm_targets::process();
}

// End of File
