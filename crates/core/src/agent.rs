// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-info aggregate and the typed messages agents exchange with
//! their manager.
//!
//! Ownership is split per the channel design: the manager owns the
//! aggregate view; agents own their container and spectrum and report
//! through queues of [`TaskFrame`] and [`SpectrumUpdate`].

use crate::status::TaskStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One status observation emitted by an agent for its current task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFrame {
    /// True only for the very first frame after launch
    pub just_created: bool,
    pub task_id: String,
    pub cont_id: String,
    /// Full container inspect JSON (empty object when inspect failed)
    pub inspect: serde_json::Value,
    /// Progress percentage (the runtime reports no finer granularity)
    pub progress: u32,
    pub status: TaskStatus,
}

/// Spectrum snapshot published by an agent after every iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectrumUpdate {
    pub agent: String,
    pub counts: BTreeMap<String, u32>,
}

impl SpectrumUpdate {
    /// Compact `STATUS:count STATUS:count …` line, the form spectra are
    /// logged in when the manager folds an update.
    pub fn format_counts(&self) -> String {
        self.counts.iter().map(|(k, v)| format!("{k}:{v}")).collect::<Vec<_>>().join(" ")
    }
}

/// Per-agent entry served by `/tstatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusEntry {
    pub task_id: String,
    pub status: TaskStatus,
    pub info: serde_json::Value,
    /// Whether this entry has not been persisted yet
    pub new: bool,
}

/// Machine-level information appended to the agent aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineInfo {
    /// 1/5/15-minute load averages
    pub load: [f64; 3],
    /// Kernel identification string
    pub uname: String,
}

/// View of one agent slot inside the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    pub num_tasks: u32,
    pub task_id: String,
    pub cont_id: String,
    pub cont_status: Option<TaskStatus>,
    pub spectrum: BTreeMap<String, u32>,
}

/// Aggregated agent information for one node.
///
/// Written only by the task manager; reads that cross tasks go through
/// a mutex around the whole structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentsInfo {
    pub agents: BTreeMap<String, AgentData>,
    pub agent_names: Vec<String>,
    pub agent_num_tasks: Vec<u32>,
    pub machine: MachineInfo,
}

impl AgentsInfo {
    /// Initialize the aggregate for a fixed, ordered set of agent names.
    pub fn new(names: &[String]) -> Self {
        Self {
            agents: names.iter().map(|n| (n.clone(), AgentData::default())).collect(),
            agent_names: names.to_vec(),
            agent_num_tasks: vec![0; names.len()],
            machine: MachineInfo::default(),
        }
    }

    /// Index of the least-loaded agent; ties resolve to the lowest index.
    pub fn least_loaded(&self) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (i, &n) in self.agent_num_tasks.iter().enumerate() {
            if best.map_or(true, |(_, bn)| n < bn) {
                best = Some((i, n));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Record a task assignment on agent `idx`.
    pub fn record_assignment(&mut self, idx: usize, task_id: &str, num_tasks: u32) {
        let Some(name) = self.agent_names.get(idx).cloned() else { return };
        if let Some(n) = self.agent_num_tasks.get_mut(idx) {
            *n = num_tasks;
        }
        if let Some(ag) = self.agents.get_mut(&name) {
            ag.task_id = task_id.to_string();
            ag.num_tasks = num_tasks;
        }
    }

    /// Record a container status observation for `agent`.
    pub fn record_container(&mut self, agent: &str, cont_id: &str, status: TaskStatus) {
        if let Some(ag) = self.agents.get_mut(agent) {
            ag.cont_id = cont_id.to_string();
            ag.cont_status = Some(status);
        }
    }

    /// Replace an agent's spectrum with a fresh snapshot.
    pub fn record_spectrum(&mut self, update: &SpectrumUpdate) {
        if let Some(ag) = self.agents.get_mut(&update.agent) {
            ag.spectrum = update.counts.clone();
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
