// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ql-config: Typed configuration for a quicklook processing node.
//!
//! The on-disk format is JSON. The loader is strict about top-level
//! keys and coerces numeric/string variants (ports) at parse time, so
//! the rest of the system only ever sees well-typed values.

pub mod model;
pub mod network;

pub use model::{
    Config, ConfigError, DbConfig, GeneralConfig, NetworkConfig, NodeConfig,
    OrchestrationConfig, RuleConfig,
};
pub use network::{NetworkError, ProcessingNetwork};
