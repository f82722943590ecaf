// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ql-store: Archive and metadata persistence.
//!
//! The [`Archive`] trait is the complete capability surface the rest of
//! the system is allowed to use; [`PgArchive`] is its PostgreSQL
//! implementation. Callers in the main loop treat every failure as
//! recoverable: log, drop the operation, continue.

pub mod archive;
pub mod postgres;
pub mod types;

pub use archive::{Archive, StoreError};
pub use postgres::PgArchive;
pub use types::{
    ConnectionParams, ICommand, ProductInfo, RestartableTask, SpectraRow, TaskRecord,
};
