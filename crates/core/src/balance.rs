// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-selection policy for cross-node dispatch.

use serde::{Deserialize, Serialize};

/// How the commander picks the node for the next product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceMode {
    /// Round-robin over the node list
    Sequential,
    /// Lowest 1-minute load average, ties to the lowest index
    #[default]
    LoadBalance,
    /// Uniform over the node list
    Random,
}

impl BalanceMode {
    /// Decode the CLI integer form (`-b 0|1|2`); out-of-range values
    /// fall back to the default.
    pub fn from_cli(v: u8) -> Self {
        match v {
            0 => BalanceMode::Sequential,
            2 => BalanceMode::Random,
            _ => BalanceMode::LoadBalance,
        }
    }
}

crate::simple_display! {
    BalanceMode {
        Sequential => "sequential",
        LoadBalance => "load-balance",
        Random => "random",
    }
}

#[cfg(test)]
#[path = "balance_tests.rs"]
mod tests;
