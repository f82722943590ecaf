// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task status state machine.
//!
//! The integer values are wire- and database-canonical; the string
//! forms appear in container inspect output and status spectra. Both
//! representations round-trip.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task (and of the container backing it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Queued on an agent, container not yet observed running
    #[serde(rename = "SCHEDULED")]
    Scheduled = -2,
    /// Container exited with a failing code
    #[serde(rename = "FAILED")]
    Failed = -1,
    /// Container exited cleanly
    #[serde(rename = "FINISHED")]
    Finished = 0,
    /// Container is running
    #[serde(rename = "RUNNING")]
    Running = 1,
    /// Container paused by the runtime
    #[serde(rename = "PAUSED")]
    Paused = 2,
    /// Container stopped by a signal (exit codes 129..159) or found dead
    #[serde(rename = "STOPPED")]
    Stopped = 3,
    /// Created but never ran, or recovered after a node restart
    #[serde(rename = "ABORTED")]
    Aborted = 4,
    /// Outputs archived
    #[serde(rename = "ARCHIVED")]
    Archived = 5,
    /// Runtime state not recognized
    #[serde(rename = "UNKNOWN_STATE")]
    Unknown = 6,
}

/// Every status, in canonical integer order.
pub const ALL_STATUSES: [TaskStatus; 9] = [
    TaskStatus::Scheduled,
    TaskStatus::Failed,
    TaskStatus::Finished,
    TaskStatus::Running,
    TaskStatus::Paused,
    TaskStatus::Stopped,
    TaskStatus::Aborted,
    TaskStatus::Archived,
    TaskStatus::Unknown,
];

impl TaskStatus {
    /// Canonical integer value (database column form).
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Convert from the canonical integer value.
    pub fn from_value(v: i32) -> Option<Self> {
        ALL_STATUSES.iter().copied().find(|s| s.value() == v)
    }

    /// Canonical string form (inspect template / spectra key form).
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Scheduled => "SCHEDULED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Finished => "FINISHED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Paused => "PAUSED",
            TaskStatus::Stopped => "STOPPED",
            TaskStatus::Aborted => "ABORTED",
            TaskStatus::Archived => "ARCHIVED",
            TaskStatus::Unknown => "UNKNOWN_STATE",
        }
    }

    /// Parse the canonical string form.
    pub fn from_name(s: &str) -> Option<Self> {
        ALL_STATUSES.iter().copied().find(|st| st.as_str() == s)
    }

    /// A task in one of these states has run to completion and its
    /// outputs can be staged.
    pub fn is_ended(self) -> bool {
        matches!(self, TaskStatus::Stopped | TaskStatus::Failed | TaskStatus::Finished)
    }
}

crate::simple_display! {
    TaskStatus {
        Scheduled => "SCHEDULED",
        Failed => "FAILED",
        Finished => "FINISHED",
        Running => "RUNNING",
        Paused => "PAUSED",
        Stopped => "STOPPED",
        Aborted => "ABORTED",
        Archived => "ARCHIVED",
        Unknown => "UNKNOWN_STATE",
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
