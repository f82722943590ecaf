// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The archive capability: every database operation the core invokes.

use crate::types::{ICommand, ProductInfo, RestartableTask, SpectraRow, TaskRecord};
use async_trait::async_trait;
use ql_core::{ProductMeta, TaskStatus};
use thiserror::Error;

/// Errors surfaced by archive operations.
///
/// Every caller in the main loop catches these, logs, and moves on;
/// nothing here unwinds the process.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Persistence operations available to the scheduling core.
#[async_trait]
pub trait Archive: Send + Sync {
    /// Open the connection if not already open. Reentrant: opening an
    /// open archive logs a warning and succeeds.
    async fn open_connection(&self) -> Result<(), StoreError>;

    /// Close the connection. Closing a closed archive is a no-op.
    async fn close_connection(&self) -> Result<(), StoreError>;

    /// Upsert products by id; on conflict only the report column is
    /// refreshed, then the filter materialized view is rebuilt.
    async fn store_products(&self, products: &[ProductMeta]) -> Result<(), StoreError>;

    /// Join products with creators, instruments, obs-modes and statuses.
    /// `criteria` is an optional SQL tail (e.g. a WHERE clause).
    async fn retrieve_products(&self, criteria: &str) -> Result<Vec<ProductInfo>, StoreError>;

    /// Insert a task row.
    async fn store_task(&self, task: &TaskRecord) -> Result<(), StoreError>;

    /// Update all mutable columns of a task row. A row first registered
    /// under a placeholder id is re-identified to the container id the
    /// first time one is known.
    async fn update_task(&self, task: &TaskRecord) -> Result<(), StoreError>;

    /// Upsert one spectra row per agent.
    async fn save_task_status_spectra(
        &self,
        agent: &str,
        row: &SpectraRow,
    ) -> Result<(), StoreError>;

    /// Append to the node state log.
    async fn store_state(&self, session: &str, node: &str, state: &str)
        -> Result<(), StoreError>;

    /// Latest `(session, state)` entry in the state log, if any.
    async fn get_latest_state(&self) -> Result<Option<(String, String)>, StoreError>;

    /// All `(node, state)` entries for a session, oldest first.
    async fn get_current_state(&self, session: &str)
        -> Result<Vec<(String, String)>, StoreError>;

    /// Append an internal command addressed to `target`.
    async fn add_icommand(&self, target: &str, source: &str, content: &str)
        -> Result<(), StoreError>;

    /// Oldest unexecuted command for `target` no older than the
    /// freshness window (15 seconds).
    async fn get_icommand(&self, target: &str) -> Result<Option<ICommand>, StoreError>;

    async fn mark_icommand_done(&self, id: i32) -> Result<(), StoreError>;

    async fn remove_icommand(&self, id: i32) -> Result<(), StoreError>;

    /// Latest version counter registered for a processor name prefix.
    async fn version_counter(&self, proc_name: &str) -> Result<i32, StoreError>;

    /// Version of the newest archived product with this signature and
    /// type, ignoring rows registered less than 10 seconds ago.
    async fn check_signature(
        &self,
        signature: &str,
        product_type: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Tasks left SCHEDULED or RUNNING by a previous process, marked
    /// ABORTED as a side effect.
    async fn retrieve_restartable_tasks(&self) -> Result<Vec<RestartableTask>, StoreError>;

    /// Upsert the current state of a node.
    async fn store_node_state(&self, node: &str, state: &str) -> Result<(), StoreError>;

    async fn retrieve_node_state(&self, node: &str) -> Result<Option<String>, StoreError>;

    /// Upsert a named variable (optionally filtered).
    async fn store_var(&self, var: &str, filter: &str, value: &str) -> Result<(), StoreError>;

    async fn retrieve_var(&self, var: &str, filter: &str) -> Result<Option<String>, StoreError>;

    /// Persist one task status frame: insert on the first frame of a
    /// task, update afterwards.
    async fn store_task_info(
        &self,
        task_id: &str,
        status: TaskStatus,
        inspect: &serde_json::Value,
        initial: bool,
    ) -> Result<(), StoreError> {
        let record = TaskRecord::from_inspect(task_id, status, inspect);
        if initial {
            self.store_task(&record).await
        } else {
            self.update_task(&record).await
        }
    }
}
