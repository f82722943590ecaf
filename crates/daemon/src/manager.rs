// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task manager: owns the local agent pool.
//!
//! The manager creates one in/out/task queue triple per agent slot,
//! assigns new tasks to the least-loaded agent, and drains the agents'
//! status frames into the agent-info aggregate and the archive.

use crate::agent::{TaskAgent, TaskAssignment};
use crate::containers::ContainerRuntime;
use crate::locator::{self, LocateMethod, LocatorError};
use crate::machine::machine_info;
use crate::watcher::{DirWatcher, WatcherError};
use parking_lot::Mutex;
use ql_config::ProcessingNetwork;
use ql_core::{
    time_tag, AgentsInfo, ProductMeta, Queue, SpectrumUpdate, TaskFrame, TaskStatusEntry,
    WorkArea,
};
use ql_store::Archive;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Name of the default per-task config file under each processor folder.
pub const DEFAULT_PROC_CFG: &str = "sample.cfg.json";

/// Errors scheduling a task onto an agent.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("no agents configured on this node")]
    NoAgents,

    #[error("cannot create task folder {0}: {1}")]
    Folders(PathBuf, #[source] std::io::Error),

    #[error("cannot place product in task input folder: {0}")]
    Input(#[from] LocatorError),

    #[error("cannot copy processor config {0}: {1}")]
    ProcessorCfg(PathBuf, #[source] std::io::Error),
}

/// Manager-side handle to one agent slot.
struct AgentHandle {
    name: String,
    in_queue: Arc<Queue<TaskAssignment>>,
    out_queue: Arc<Queue<SpectrumUpdate>>,
    task_queue: Arc<Queue<TaskFrame>>,
}

/// The local agent pool and its aggregated view.
pub struct TaskManager {
    wa: WorkArea,
    agents: Vec<AgentHandle>,
    info: Arc<Mutex<AgentsInfo>>,
    tstatus: Arc<Mutex<BTreeMap<String, TaskStatusEntry>>>,
    outbox_watcher: DirWatcher,
    outbox_queue: Queue<String>,
}

impl TaskManager {
    /// Build the pool. The returned agents must be spawned by the
    /// caller (`tokio::spawn(agent.run())`).
    pub fn new(
        wa: &WorkArea,
        net: &ProcessingNetwork,
        runtime: Arc<dyn ContainerRuntime>,
        quit: &CancellationToken,
    ) -> Result<(Self, Vec<TaskAgent>), WatcherError> {
        let names = net.this_node_agents();
        info!(
            node = %net.this_node,
            agents = names.len(),
            "creating processing agents"
        );

        let mut handles = Vec::with_capacity(names.len());
        let mut agents = Vec::with_capacity(names.len());
        for name in names {
            let handle = AgentHandle {
                name: name.clone(),
                in_queue: Arc::new(Queue::new()),
                out_queue: Arc::new(Queue::new()),
                task_queue: Arc::new(Queue::new()),
            };
            agents.push(TaskAgent::new(
                wa.clone(),
                name.clone(),
                Arc::clone(&handle.in_queue),
                Arc::clone(&handle.out_queue),
                Arc::clone(&handle.task_queue),
                Arc::clone(&runtime),
                quit.clone(),
            ));
            handles.push(handle);
        }

        let manager = Self {
            wa: wa.clone(),
            info: Arc::new(Mutex::new(AgentsInfo::new(names))),
            tstatus: Arc::new(Mutex::new(BTreeMap::new())),
            outbox_watcher: DirWatcher::new(&wa.local_outputs)?,
            outbox_queue: Queue::new(),
            agents: handles,
        };
        Ok((manager, agents))
    }

    /// Shared agent-info aggregate (read by the HTTP `/status` handler).
    pub fn info_handle(&self) -> Arc<Mutex<AgentsInfo>> {
        Arc::clone(&self.info)
    }

    /// Shared per-agent task view (read by the HTTP `/tstatus` handler).
    pub fn tstatus_handle(&self) -> Arc<Mutex<BTreeMap<String, TaskStatusEntry>>> {
        Arc::clone(&self.tstatus)
    }

    /// Create a task for `meta` and hand it to the least-loaded agent.
    /// Returns the new task id.
    pub fn schedule(
        &self,
        meta: &mut ProductMeta,
        processor: &str,
    ) -> Result<String, ScheduleError> {
        let (idx, num_tasks) = {
            let info = self.info.lock();
            let idx = info.least_loaded().ok_or(ScheduleError::NoAgents)?;
            (idx, info.agent_num_tasks[idx] + 1)
        };
        let agent = &self.agents[idx];

        let task_id = format!("{}_{}-{:04}", agent.name, time_tag(), num_tasks);
        let folder = self.wa.task_folder(&task_id);
        for sub in ["in", "out", "log"] {
            let p = folder.join(sub);
            std::fs::create_dir_all(&p).map_err(|e| ScheduleError::Folders(p, e))?;
        }

        locator::to_task_input(meta, &self.wa, &task_id, LocateMethod::Link)?;

        let src = self.wa.proc_area.join(processor).join(DEFAULT_PROC_CFG);
        let dst = folder.join(format!("{processor}.cfg"));
        std::fs::copy(&src, &dst).map_err(|e| ScheduleError::ProcessorCfg(src.clone(), e))?;

        agent.in_queue.push(TaskAssignment {
            task_id: task_id.clone(),
            task_folder: folder,
            processor: processor.to_string(),
        });
        self.info.lock().record_assignment(idx, &task_id, num_tasks);
        debug!(agent = %agent.name, task = %task_id, "task scheduled");
        Ok(task_id)
    }

    /// Drain every agent's status frames into the aggregate, the
    /// `/tstatus` view, and (when an archive is present) the database.
    pub async fn update_tasks_info(&self, archive: Option<&dyn Archive>) {
        for handle in &self.agents {
            while let Some(frame) = handle.task_queue.get() {
                self.info.lock().record_container(&handle.name, &frame.cont_id, frame.status);

                let mut persisted = false;
                if let Some(archive) = archive {
                    if !frame.inspect.is_null() {
                        match archive
                            .store_task_info(
                                &frame.task_id,
                                frame.status,
                                &frame.inspect,
                                frame.just_created,
                            )
                            .await
                        {
                            Ok(()) => persisted = true,
                            Err(e) => {
                                warn!(task = %frame.task_id, "cannot persist task frame: {e}");
                            }
                        }
                    }
                }

                self.tstatus.lock().insert(
                    handle.name.clone(),
                    TaskStatusEntry {
                        task_id: frame.task_id,
                        status: frame.status,
                        info: frame.inspect,
                        new: !persisted,
                    },
                );
            }
        }
    }

    /// Append newly staged outbox files to `outputs`.
    pub fn retrieve_outputs(&self, outputs: &Queue<String>) {
        self.outbox_watcher.drain_into(&self.outbox_queue);
        while let Some(path) = self.outbox_queue.get() {
            debug!(file = %path, "registered output file");
            outputs.push(path);
        }
    }

    /// Fold pending spectrum updates and a fresh machine snapshot into
    /// the aggregate, returning a copy.
    pub fn retrieve_agents_info(&self) -> AgentsInfo {
        let mut info = self.info.lock();
        for handle in &self.agents {
            while let Some(update) = handle.out_queue.get() {
                debug!(agent = %update.agent, spectrum = %update.format_counts(), "agent spectrum");
                info.record_spectrum(&update);
            }
        }
        info.machine = machine_info();
        info.clone()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
