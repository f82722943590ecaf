// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task agent: one worker slot running containers one at a time.
//!
//! Each agent is a single task running a cooperative loop: drain the
//! in-queue into a backlog, launch or poll the current container,
//! publish status frames and the spectrum, stage outputs when the task
//! ends, and sweep containers past their removal grace period.

pub mod prep;
pub mod removal;

use self::removal::RemovalQueue;
use crate::containers::{inspect_template, ContainerRuntime};
use crate::locator::{self, LocateMethod};
use ql_core::{
    ContainerSpectrum, FileNameSpec, Queue, SpectrumUpdate, TaskFrame, TaskStatus, WorkArea,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Baseline delay per agent iteration.
pub const AGENT_LOOP_DELAY: Duration = Duration::from_millis(333);

/// Settle delay between a container launch and its first inspect.
const LAUNCH_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// One task handed from the manager to an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAssignment {
    pub task_id: String,
    pub task_folder: PathBuf,
    pub processor: String,
}

/// The container an agent is currently minding.
struct RunningTask {
    assignment: TaskAssignment,
    cont_id: String,
    io: Value,
    status: TaskStatus,
}

/// One worker slot on this node.
pub struct TaskAgent {
    wa: WorkArea,
    name: String,
    in_queue: Arc<Queue<TaskAssignment>>,
    out_queue: Arc<Queue<SpectrumUpdate>>,
    task_queue: Arc<Queue<TaskFrame>>,
    runtime: Arc<dyn ContainerRuntime>,
    quit: CancellationToken,
    backlog: VecDeque<TaskAssignment>,
    current: Option<RunningTask>,
    spectrum: ContainerSpectrum,
    removals: RemovalQueue,
    uid: String,
    uname: String,
}

impl TaskAgent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        wa: WorkArea,
        name: String,
        in_queue: Arc<Queue<TaskAssignment>>,
        out_queue: Arc<Queue<SpectrumUpdate>>,
        task_queue: Arc<Queue<TaskFrame>>,
        runtime: Arc<dyn ContainerRuntime>,
        quit: CancellationToken,
    ) -> Self {
        Self {
            wa,
            name,
            in_queue,
            out_queue,
            task_queue,
            runtime,
            quit,
            backlog: VecDeque::new(),
            current: None,
            spectrum: ContainerSpectrum::new(),
            removals: RemovalQueue::default(),
            uid: nix::unistd::getuid().to_string(),
            uname: std::env::var("USER").unwrap_or_default(),
        }
    }

    /// Run until quitting and idle.
    pub async fn run(mut self) {
        info!(agent = %self.name, "task agent started");
        loop {
            self.iterate().await;
            if self.quit.is_cancelled() && self.current.is_none() {
                break;
            }
            tokio::time::sleep(AGENT_LOOP_DELAY).await;
        }
        info!(agent = %self.name, "task agent stopped");
    }

    /// One loop iteration; public to the crate for direct driving in
    /// tests.
    pub(crate) async fn iterate(&mut self) {
        while let Some(assignment) = self.in_queue.get() {
            debug!(
                agent = %self.name,
                task = %assignment.task_id,
                folder = %assignment.task_folder.display(),
                processor = %assignment.processor,
                "new task queued"
            );
            self.backlog.push_back(assignment);
        }
        self.monitor().await;
        self.sweep_removals().await;
    }

    async fn monitor(&mut self) {
        if self.current.is_none() {
            if self.backlog.is_empty() {
                return;
            }
            if !self.launch_next().await {
                return;
            }
        } else {
            self.poll_current().await;
        }

        self.publish_spectrum();

        let ended = self
            .current
            .as_ref()
            .filter(|t| t.status.is_ended())
            .map(|t| (t.assignment.task_folder.clone(), t.cont_id.clone()));
        if let Some((folder, cont_id)) = ended {
            self.prepare_outputs(&folder);
            debug!(agent = %self.name, cont = %cont_id, "scheduling container for removal");
            self.removals.schedule(Instant::now(), cont_id);
            self.current = None;
        }
    }

    /// Launch the next backlog task. Returns false when nothing was
    /// launched (empty backlog, preparation failure, launch failure).
    async fn launch_next(&mut self) -> bool {
        let Some(assignment) = self.backlog.pop_front() else { return false };

        let prep = match prep::prepare(
            &assignment.task_id,
            &assignment.task_folder,
            &assignment.processor,
            &self.wa.proc_area,
        ) {
            Ok(p) => p,
            Err(e) => {
                error!(agent = %self.name, task = %assignment.task_id, "cannot prepare task: {e}");
                return false;
            }
        };

        let opts = vec![
            "--workdir".to_string(),
            prep.workdir.clone(),
            "--env".to_string(),
            format!("UID={}", self.uid),
            "--env".to_string(),
            format!("UNAME={}", self.uname),
            "--env".to_string(),
            format!("WDIR={}", prep.workdir),
        ];

        let cont_id = match self
            .runtime
            .create(&prep.image, &opts, &prep.mapping, &prep.exe, &prep.args)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!(agent = %self.name, task = %assignment.task_id, "cannot launch container: {e}");
                return false;
            }
        };

        tokio::time::sleep(LAUNCH_SETTLE_DELAY).await;

        let inspect = self.inspect_normalized(&cont_id, &prep.io).await.unwrap_or(Value::Null);
        self.task_queue.push(TaskFrame {
            just_created: true,
            task_id: assignment.task_id.clone(),
            cont_id: cont_id.clone(),
            inspect,
            progress: 1,
            status: TaskStatus::Scheduled,
        });
        self.spectrum.append(&cont_id, TaskStatus::Scheduled);
        info!(agent = %self.name, cont = %cont_id, task = %assignment.task_id,
              "new task launched in container");

        self.current = Some(RunningTask {
            assignment,
            cont_id,
            io: prep.io,
            status: TaskStatus::Scheduled,
        });
        true
    }

    /// Poll the current container and emit a status frame.
    async fn poll_current(&mut self) {
        let Some((cont_id, io, task_id)) = self
            .current
            .as_ref()
            .map(|t| (t.cont_id.clone(), t.io.clone(), t.assignment.task_id.clone()))
        else {
            return;
        };

        let Some(inspect) = self.inspect_normalized(&cont_id, &io).await else { return };

        let status = inspect
            .get("Task_Status")
            .and_then(|s| s.as_str())
            .and_then(TaskStatus::from_name)
            .unwrap_or(TaskStatus::Unknown);

        self.task_queue.push(TaskFrame {
            just_created: false,
            task_id,
            cont_id: cont_id.clone(),
            inspect,
            progress: 1,
            status,
        });
        self.spectrum.append(&cont_id, status);
        if let Some(t) = self.current.as_mut() {
            t.status = status;
        }
    }

    /// Inspect through the status-normalizing template and inject the
    /// IO summary. `None` means the inspect failed; the caller retries
    /// on the next iteration.
    async fn inspect_normalized(&self, cont_id: &str, io: &Value) -> Option<Value> {
        let template = inspect_template(self.quit.is_cancelled());
        match self.runtime.inspect(cont_id, Some(&template)).await {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(mut v) => {
                    if let Some(obj) = v.as_object_mut() {
                        obj.insert("IO".to_string(), io.clone());
                    }
                    Some(v)
                }
                Err(e) => {
                    warn!(agent = %self.name, cont = %cont_id,
                          "inspect output is not valid JSON: {e}");
                    None
                }
            },
            Err(e) => {
                warn!(agent = %self.name, cont = %cont_id,
                      "couldn't get inspection information: {e}");
                None
            }
        }
    }

    fn publish_spectrum(&self) {
        let counts =
            self.spectrum.spectrum().into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        self.out_queue.push(SpectrumUpdate { agent: self.name.clone(), counts });
    }

    /// Stage a finished task's artifacts: logs go to the outbox bound
    /// for the archive, outputs go back to the inbox so they can fire
    /// new rules.
    fn prepare_outputs(&self, task_folder: &Path) {
        let fns = FileNameSpec::new();
        for (sub, only_logs) in [("log", true), ("out", false)] {
            let dir = task_folder.join(sub);
            let entries = match std::fs::read_dir(&dir) {
                Ok(e) => e,
                Err(e) => {
                    warn!(agent = %self.name, dir = %dir.display(), "cannot list folder: {e}");
                    continue;
                }
            };
            for entry in entries.filter_map(Result::ok) {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                if only_logs && path.extension().map_or(true, |e| e != "log") {
                    continue;
                }
                let mut meta = match fns.parse(&path) {
                    Ok(p) => p.meta,
                    Err(e) => {
                        error!(agent = %self.name, "cannot parse file name: {e}");
                        continue;
                    }
                };
                let result = if only_logs {
                    locator::to_local_outputs(&mut meta, &self.wa, LocateMethod::Move)
                } else {
                    locator::to_local_inbox(&mut meta, &self.wa, LocateMethod::Move)
                };
                if let Err(e) = result {
                    error!(agent = %self.name, "cannot stage {}: {e}", path.display());
                }
            }
        }
    }

    /// Remove containers whose grace period has elapsed.
    async fn sweep_removals(&mut self) {
        let now = Instant::now();
        for cont_id in self.removals.due(now) {
            match self.runtime.remove(&cont_id).await {
                Ok(()) => debug!(agent = %self.name, cont = %cont_id, "removed container"),
                Err(e) => {
                    warn!(agent = %self.name, cont = %cont_id, "couldn't remove container: {e}");
                    self.removals.retry(now, cont_id);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_removals(&self) -> usize {
        self.removals.len()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
