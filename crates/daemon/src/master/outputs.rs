// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output drain: archive on the commander, reflux to it from workers.

use super::Master;
use crate::locator::{self, LocateMethod};
use std::path::PathBuf;
use tracing::{debug, error, warn};

impl Master {
    /// Collect staged outputs, then archive (commander) or send them to
    /// the commander (worker).
    pub(super) async fn drain_outputs(&mut self) {
        self.manager.retrieve_outputs(&self.output_products);
        if self.net.this_is_commander {
            self.archive_outputs().await;
        } else {
            self.transfer_archive_to_commander().await;
            self.transfer_outputs_to_commander().await;
        }
    }

    /// Parse, persist and move each output into the local archive.
    async fn archive_outputs(&mut self) {
        while let Some(prod) = self.output_products.get() {
            let path = PathBuf::from(&prod);
            let mut meta = match self.fns.parse(&path) {
                Ok(parsed) => parsed.meta,
                Err(e) => {
                    warn!("output '{prod}' doesn't seem to be a valid product: {e}");
                    continue;
                }
            };
            if let Some(archive) = &self.archive {
                if let Err(e) = archive.store_products(std::slice::from_ref(&meta)).await {
                    warn!("cannot persist output metadata: {e}");
                }
            }
            if let Err(e) = locator::to_local_archive(&mut meta, &self.wa, LocateMethod::Move) {
                error!("cannot move output {prod} into the archive: {e}");
            }
        }
    }

    /// Push everything in the local archive to the commander's
    /// `/outputs`; each file is dropped only after a 200 response.
    async fn transfer_archive_to_commander(&mut self) {
        let entries = match std::fs::read_dir(&self.wa.archive) {
            Ok(e) => e,
            Err(e) => {
                warn!("cannot list local archive: {e}");
                return;
            }
        };
        let commander_url = self.net.node_server_urls[self.net.commander_idx].clone();
        self.requester.set_server_url(commander_url);
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match self.requester.post_file("/outputs", &path).await {
                Ok(()) => {
                    debug!(file = %path.display(), "archive entry sent to commander");
                    let _ = std::fs::remove_file(&path);
                }
                Err(e) => {
                    warn!(file = %path.display(), "cannot send archive entry: {e}");
                }
            }
        }
    }

    /// Push pending outputs to the commander's `/outputs`. Failed sends
    /// go back on the queue for the next iteration.
    async fn transfer_outputs_to_commander(&mut self) {
        let commander_url = self.net.node_server_urls[self.net.commander_idx].clone();
        self.requester.set_server_url(commander_url);
        let pending = self.output_products.drain();
        for prod in pending {
            let path = PathBuf::from(&prod);
            match self.requester.post_file("/outputs", &path).await {
                Ok(()) => {
                    debug!(file = %prod, "output sent to commander");
                    let _ = std::fs::remove_file(&path);
                }
                Err(e) => {
                    warn!(file = %prod, "cannot send output, will retry: {e}");
                    self.output_products.push(prod);
                }
            }
        }
    }
}
