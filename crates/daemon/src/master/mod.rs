// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Master coordinator: the node main loop.
//!
//! Runs once per heartbeat (default one second): ingest new products,
//! distribute (commander) or adopt them locally, schedule fired rules,
//! refresh the agent aggregate, drain outputs, flush task frames to the
//! archive, and (commander) gather the other nodes' status.

mod distribute;
mod outputs;

use crate::locator::{self, LocateMethod};
use crate::manager::TaskManager;
use crate::orchestrator::TaskOrchestrator;
use crate::requester::Requester;
use crate::watcher::{DirWatcher, WatcherError};
use ql_config::ProcessingNetwork;
use ql_core::{BalanceMode, FileNameSpec, ProductMeta, Queue, WorkArea};
use ql_store::{Archive, SpectraRow};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Cadence (in heartbeats) of agent-info refresh and cluster gathering.
const REFRESH_EVERY: u64 = 5;

/// The per-node coordinator.
pub struct Master {
    net: ProcessingNetwork,
    wa: WorkArea,
    balance_mode: BalanceMode,
    heart_beat: Duration,
    manager: TaskManager,
    orchestrator: TaskOrchestrator,
    requester: Requester,
    /// Present on the commander only
    archive: Option<Arc<dyn Archive>>,
    quit: CancellationToken,
    fns: FileNameSpec,

    inbox_watcher: DirWatcher,
    reproc_watcher: DirWatcher,

    product_list: Queue<String>,
    products_for_processing: Queue<String>,
    /// Metadata of products dispatched to other nodes, awaiting local
    /// bookkeeping
    products_for_archival: Queue<ProductMeta>,
    output_products: Queue<String>,

    loads: Vec<f64>,
    last_node_used: usize,
    /// Last known `/status` document per node; entries persist when a
    /// node stops answering
    node_status: HashMap<String, Value>,
}

impl Master {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        net: ProcessingNetwork,
        wa: WorkArea,
        balance_mode: BalanceMode,
        heart_beat: Duration,
        manager: TaskManager,
        orchestrator: TaskOrchestrator,
        archive: Option<Arc<dyn Archive>>,
        quit: CancellationToken,
    ) -> Result<Self, WatcherError> {
        let inbox_watcher = DirWatcher::new(&wa.local_inbox)?;
        let reproc_watcher = DirWatcher::new(&wa.reproc)?;
        let num_nodes = net.num_nodes;
        Ok(Self {
            net,
            wa,
            balance_mode,
            heart_beat,
            manager,
            orchestrator,
            requester: Requester::new(),
            archive,
            quit,
            fns: FileNameSpec::new(),
            inbox_watcher,
            reproc_watcher,
            product_list: Queue::new(),
            products_for_processing: Queue::new(),
            products_for_archival: Queue::new(),
            output_products: Queue::new(),
            loads: vec![1.0; num_nodes],
            last_node_used: 0,
            node_status: HashMap::new(),
        })
    }

    /// Run the main loop until the quit token fires.
    pub async fn run(&mut self) {
        info!(session = %self.wa.session_id, node = %self.net.this_node, "starting session");
        debug!("work area layout:\n{}", self.wa);

        self.startup_recovery().await;

        let quit = self.quit.clone();
        let mut ticker = tokio::time::interval(self.heart_beat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut iteration: u64 = 0;

        while !quit.is_cancelled() {
            iteration += 1;

            self.ingest();
            self.schedule_products().await;

            if iteration == 1 || iteration % REFRESH_EVERY == 0 {
                self.refresh_agents_info().await;
            }

            self.drain_outputs().await;
            self.persist_task_frames().await;

            if self.net.this_is_commander && (iteration == 1 || iteration % REFRESH_EVERY == 0)
            {
                self.gather_nodes_status().await;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = quit.cancelled() => break,
            }
        }
        info!("master loop done");
    }

    /// Record the session start and log tasks orphaned by a previous
    /// process. Recovered tasks are marked ABORTED by the archive; they
    /// are not re-enqueued.
    async fn startup_recovery(&self) {
        let Some(archive) = &self.archive else { return };

        if let Err(e) =
            archive.store_state(&self.wa.session_id, &self.net.this_node, "RUNNING").await
        {
            warn!("cannot record session state: {e}");
        }

        match archive.retrieve_restartable_tasks().await {
            Ok(tasks) if !tasks.is_empty() => {
                info!(
                    count = tasks.len(),
                    "tasks left over from a previous session were marked ABORTED"
                );
            }
            Ok(_) => {}
            Err(e) => warn!("cannot look for restartable tasks: {e}"),
        }
    }

    /// Pull new inbox and reprocessing arrivals onto the product list.
    fn ingest(&self) {
        self.inbox_watcher.drain_into(&self.product_list);
        self.reproc_watcher.drain_into(&self.product_list);
    }

    /// Route pending products, then archive and schedule the local ones.
    async fn schedule_products(&mut self) {
        if self.product_list.is_empty()
            && self.products_for_processing.is_empty()
            && self.products_for_archival.is_empty()
        {
            return;
        }

        if self.net.this_is_commander {
            self.distribute_products().await;
        } else {
            self.products_for_processing.append(&self.product_list);
        }

        while let Some(prod) = self.products_for_processing.get() {
            let path = PathBuf::from(&prod);
            let mut meta = match self.fns.parse(&path) {
                Ok(parsed) => parsed.meta,
                Err(e) => {
                    warn!("file '{prod}' doesn't seem to be a valid product: {e}");
                    continue;
                }
            };
            info!(product = %prod, "product will be processed");

            if let Err(e) = locator::to_local_archive(&mut meta, &self.wa, LocateMethod::Link) {
                error!("move (link) to archive of {prod} failed: {e}");
                continue;
            }

            if !self.orchestrator.schedule(&mut meta, &self.manager) {
                let _ = std::fs::remove_file(&path);
            }
        }

        // Products dispatched to other nodes only need their metadata
        // kept and the local copy dropped.
        if self.net.this_is_commander {
            while let Some(meta) = self.products_for_archival.get() {
                if let Some(archive) = &self.archive {
                    if let Err(e) = archive.store_products(std::slice::from_ref(&meta)).await {
                        warn!("cannot persist dispatched product metadata: {e}");
                    }
                }
                let _ = std::fs::remove_file(&meta.fileinfo.full);
            }
        }
    }

    /// Fold agent spectra into the local view and persist them.
    async fn refresh_agents_info(&mut self) {
        let info = self.manager.retrieve_agents_info();
        match serde_json::to_value(&info) {
            Ok(v) => {
                self.node_status.insert(self.net.this_node.clone(), v);
            }
            Err(e) => warn!("cannot serialize agent info: {e}"),
        }

        if let Some(archive) = &self.archive {
            for (agent, data) in &info.agents {
                let row = SpectraRow::from_counts(&data.spectrum);
                if let Err(e) = archive.save_task_status_spectra(agent, &row).await {
                    warn!(agent = %agent, "cannot save status spectra: {e}");
                }
            }
        }
    }

    /// Flush per-agent status frames into the archive (commander) and
    /// the `/tstatus` view.
    async fn persist_task_frames(&self) {
        self.manager.update_tasks_info(self.archive.as_deref()).await;
    }

    /// Collect `/status` and `/tstatus` from every other node.
    async fn gather_nodes_status(&mut self) {
        for node in self.net.nodes_but_commander.clone() {
            let Some(idx) = self.net.node_names.iter().position(|n| *n == node) else {
                continue;
            };
            let Some(url) = self.net.server_url(idx) else { continue };
            self.requester.set_server_url(url.to_string());

            match self.requester.request_data("/status").await {
                Ok(text) => match serde_json::from_str::<Value>(&text) {
                    Ok(v) => {
                        self.node_status.insert(node.clone(), v);
                    }
                    Err(e) => warn!(node = %node, "malformed node status: {e}"),
                },
                // Keep the last known entry for unreachable nodes
                Err(e) => warn!(node = %node, "couldn't get node status: {e}"),
            }

            match self.requester.request_data("/tstatus").await {
                Ok(text) => self.persist_remote_tasks(&node, &text).await,
                Err(e) => warn!(node = %node, "couldn't get node task status: {e}"),
            }
        }
    }

    /// Persist the task frames a worker exposes on `/tstatus`.
    async fn persist_remote_tasks(&self, node: &str, body: &str) {
        let Some(archive) = &self.archive else { return };
        let entries: std::collections::BTreeMap<String, ql_core::TaskStatusEntry> =
            match serde_json::from_str(body) {
                Ok(map) => map,
                Err(e) => {
                    warn!(node = %node, "malformed node task status: {e}");
                    return;
                }
            };
        for (agent, entry) in entries {
            if entry.task_id.is_empty() {
                continue;
            }
            if let Err(e) = archive
                .store_task_info(&entry.task_id, entry.status, &entry.info, entry.new)
                .await
            {
                warn!(node = %node, agent = %agent, "cannot persist remote task frame: {e}");
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
