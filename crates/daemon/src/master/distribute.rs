// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commander-side product distribution.
//!
//! Each pending product is assigned a node by the balancing policy.
//! JSON reports are pinned to the commander. Products that need a
//! version (or collide with an archived signature) are renamed and fed
//! back through the parser before dispatch.

use super::Master;
use ql_core::{BalanceMode, FileVersion, ParsedProduct};
use rand::Rng;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

impl Master {
    /// Distribute every product on the list to a node, posting foreign
    /// assignments and keeping local ones.
    pub(super) async fn distribute_products(&mut self) {
        self.refresh_loads();

        while let Some(prod) = self.product_list.get() {
            let path = PathBuf::from(&prod);
            let parsed = match self.fns.parse(&path) {
                Ok(p) => p,
                Err(e) => {
                    warn!("file '{prod}' doesn't seem to be a valid product: {e}");
                    continue;
                }
            };

            if let Some(renamed) = self.assign_version(&path, &parsed).await {
                self.product_list.push(renamed.display().to_string());
                continue;
            }

            // Reports never leave the commander
            let node_idx = if parsed.meta.format == "JSON" {
                self.net.commander_idx
            } else {
                select_node(self.balance_mode, self.last_node_used, &self.loads)
            };
            let node = &self.net.node_names[node_idx];
            debug!("processing of {prod} will be done by node {node}");

            if node_idx == self.net.this_node_idx {
                self.products_for_processing.push(prod);
            } else {
                let url = self.net.node_server_urls[node_idx].clone();
                self.requester.set_server_url(url);
                match self.requester.post_file("/inbox", &path).await {
                    Ok(()) => self.products_for_archival.push(parsed.meta),
                    Err(e) => {
                        error!("cannot send file {prod} to node {node}: {e}");
                        // Fall back to processing it here
                        self.products_for_processing.push(prod);
                    }
                }
            }

            self.last_node_used = node_idx;
        }
    }

    /// Pull the 1-minute load of every node from the latest snapshots.
    fn refresh_loads(&mut self) {
        for (i, name) in self.net.node_names.iter().enumerate() {
            if let Some(load) = self
                .node_status
                .get(name)
                .and_then(|s| s.pointer("/machine/load/0"))
                .and_then(Value::as_f64)
            {
                self.loads[i] = load;
            }
        }
    }

    /// Rename the product when it needs a version tag, or when its
    /// signature collides with an archived product. Returns the renamed
    /// path; the caller re-parses it on the next pass.
    pub(super) async fn assign_version(
        &self,
        path: &Path,
        parsed: &ParsedProduct,
    ) -> Option<PathBuf> {
        let archive = self.archive.as_ref()?;
        let meta = &parsed.meta;

        let existing = if parsed.needs_version {
            None
        } else {
            match archive.check_signature(&meta.signature, &meta.product_type).await {
                Ok(v) => v,
                Err(e) => {
                    warn!("cannot check product signature: {e}");
                    return None;
                }
            }
        };

        let counter = if parsed.needs_version {
            match archive.version_counter(&meta.fileinfo.name).await {
                Ok(c) => Some(c),
                Err(e) => {
                    warn!("cannot obtain version counter: {e}");
                    return None;
                }
            }
        } else {
            None
        };

        let new_version = decide_version(parsed.needs_version, counter, existing.as_deref(), &meta.version)?;

        let mut renamed = meta.clone();
        renamed.version = new_version.to_string();
        let new_base = renamed.compose();
        let target = meta.fileinfo.path.join(&new_base);
        match std::fs::rename(path, &target) {
            Ok(()) => {
                info!(from = %meta.fileinfo.base, to = %new_base, "product renamed");
                Some(target)
            }
            Err(e) => {
                warn!("cannot rename product {}: {e}", path.display());
                None
            }
        }
    }
}

/// Version decision for one product.
///
/// - A product without a version suffix gets `counter+1` as its major.
/// - A product whose exact version is already archived under the same
///   signature gets the next minor.
/// - Otherwise the product keeps its name.
pub(super) fn decide_version(
    needs_version: bool,
    counter: Option<i32>,
    existing: Option<&str>,
    current: &str,
) -> Option<FileVersion> {
    if needs_version {
        let counter = counter.unwrap_or(0).max(0) as u32;
        return Some(FileVersion::new(counter + 1, 0));
    }
    match existing {
        Some(v) if v == current => {
            let mut bumped = FileVersion::parse(v);
            bumped.incr_minor();
            Some(bumped)
        }
        _ => None,
    }
}

/// Pick the node for the next product.
pub(super) fn select_node(mode: BalanceMode, last_used: usize, loads: &[f64]) -> usize {
    let n = loads.len().max(1);
    match mode {
        BalanceMode::Sequential => (last_used + 1) % n,
        BalanceMode::LoadBalance => {
            let mut best = 0;
            for (i, load) in loads.iter().enumerate() {
                if *load < loads[best] {
                    best = i;
                }
            }
            best
        }
        BalanceMode::Random => rand::thread_rng().gen_range(0..n),
    }
}

#[cfg(test)]
#[path = "distribute_tests.rs"]
mod tests;
