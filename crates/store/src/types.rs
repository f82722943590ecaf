// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record types crossing the archive boundary.

use ql_core::TaskStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Database connection parameters. Setting them does not open a
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub pwd: String,
}

impl ConnectionParams {
    pub fn url(&self) -> String {
        format!("postgres://{}:{}@{}:{}/{}", self.user, self.pwd, self.host, self.port, self.name)
    }
}

/// One task row, as stored and updated in `tasks_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u32,
    pub exit_code: i32,
    /// Working directory of the container
    pub path: String,
    pub start_time: String,
    pub end_time: String,
    /// Full inspect JSON
    pub info: serde_json::Value,
    /// Inspect subset used for re-identification and queries
    pub data: serde_json::Value,
}

impl TaskRecord {
    /// Compose a record from a container inspect document.
    ///
    /// Missing inspect fields default to empty so a record can be
    /// stored even for a task whose container never materialized.
    pub fn from_inspect(task_id: &str, status: TaskStatus, inspect: &serde_json::Value) -> Self {
        let text = |ptr: &str| {
            inspect.pointer(ptr).and_then(|v| v.as_str()).unwrap_or_default().to_string()
        };
        Self {
            task_id: task_id.to_string(),
            status,
            progress: 1,
            exit_code: inspect
                .pointer("/State/ExitCode")
                .and_then(|v| v.as_i64())
                .unwrap_or_default() as i32,
            path: text("/Config/WorkingDir"),
            start_time: text("/State/StartedAt"),
            end_time: text("/State/FinishedAt"),
            info: inspect.clone(),
            data: subset(inspect),
        }
    }

    /// Container id carried in the inspect subset, when present.
    pub fn container_id(&self) -> Option<&str> {
        self.data.get("Id").and_then(|v| v.as_str()).filter(|s| !s.is_empty())
    }
}

/// Reduce a full inspect document to the columns queries care about.
fn subset(inspect: &serde_json::Value) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for key in ["Id", "State", "Path", "Args", "IO"] {
        if let Some(v) = inspect.get(key) {
            out.insert(key.to_string(), v.clone());
        }
    }
    serde_json::Value::Object(out)
}

/// Per-agent spectra row for `task_status_spectra`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectraRow {
    pub running: i32,
    /// SCHEDULED count (legacy column name)
    pub waiting: i32,
    pub paused: i32,
    pub stopped: i32,
    pub failed: i32,
    pub finished: i32,
    pub total: i32,
}

impl SpectraRow {
    /// Fold a spectrum counts map into the row shape.
    pub fn from_counts(counts: &BTreeMap<String, u32>) -> Self {
        let get = |k: &str| counts.get(k).copied().unwrap_or(0) as i32;
        Self {
            running: get("RUNNING"),
            waiting: get("SCHEDULED"),
            paused: get("PAUSED"),
            stopped: get("STOPPED"),
            failed: get("FAILED"),
            finished: get("FINISHED"),
            total: counts.values().map(|v| *v as i32).sum(),
        }
    }
}

/// A product row returned by `retrieve_products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_id: String,
    pub product_type: String,
    pub status: String,
    pub version: String,
    pub size: i64,
    pub creator: String,
    pub instrument: String,
    pub obs_mode: String,
    pub start_time: String,
    pub end_time: String,
    pub registration_time: String,
    pub url: String,
}

/// A pending internal command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ICommand {
    pub id: i32,
    pub source: String,
    pub content: String,
}

/// A task recovered at startup (already marked ABORTED).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartableTask {
    pub id: i64,
    pub info: serde_json::Value,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
