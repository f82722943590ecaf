// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine-level measurements served under the `machine` key of
//! `/status`.

use ql_core::MachineInfo;
use sysinfo::System;

/// Snapshot the load averages and the kernel identification string.
pub fn machine_info() -> MachineInfo {
    let load = System::load_average();
    MachineInfo {
        load: [load.one, load.five, load.fifteen],
        uname: format!(
            "{} {}",
            System::name().unwrap_or_else(|| "unknown".to_string()),
            System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
        ),
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
