// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running histogram of container statuses per agent.
//!
//! The spectrum tracks the last [`SPECTRUM_WINDOW`] containers an agent
//! has observed. Each live container contributes its most recent status
//! to the histogram; when a container is evicted from the window its
//! last status is sealed into the `saved` histogram. At any time
//! `saved + live` equals the total number of containers ever observed.

use crate::status::{TaskStatus, ALL_STATUSES};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Bounded-history window size per agent.
pub const SPECTRUM_WINDOW: usize = 40;

/// Bounded container-status histogram.
#[derive(Debug, Clone)]
pub struct ContainerSpectrum {
    capacity: usize,
    /// Container ids in observation order, oldest first
    window: VecDeque<String>,
    /// Last known status per live container
    statuses: HashMap<String, TaskStatus>,
    /// Sealed counts of evicted containers
    saved: BTreeMap<&'static str, u32>,
}

impl Default for ContainerSpectrum {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerSpectrum {
    pub fn new() -> Self {
        Self::with_capacity(SPECTRUM_WINDOW)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            window: VecDeque::new(),
            statuses: HashMap::new(),
            saved: ALL_STATUSES.iter().map(|s| (s.as_str(), 0)).collect(),
        }
    }

    /// Record an observation of `cont_id` in `status`.
    ///
    /// A new container entering a full window evicts the oldest one,
    /// moving its last-known status count into the saved histogram.
    pub fn append(&mut self, cont_id: &str, status: TaskStatus) {
        if !self.statuses.contains_key(cont_id) {
            if self.window.len() == self.capacity {
                if let Some(evicted) = self.window.pop_front() {
                    if let Some(old) = self.statuses.remove(&evicted) {
                        if let Some(n) = self.saved.get_mut(old.as_str()) {
                            *n += 1;
                        }
                    }
                }
            }
            self.window.push_back(cont_id.to_string());
        }
        self.statuses.insert(cont_id.to_string(), status);
    }

    /// Combined histogram: sealed counts plus live-window counts.
    pub fn spectrum(&self) -> BTreeMap<&'static str, u32> {
        let mut spec = self.saved.clone();
        for status in self.statuses.values() {
            if let Some(n) = spec.get_mut(status.as_str()) {
                *n += 1;
            }
        }
        spec
    }

    /// Number of containers currently in the window.
    pub fn live_len(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
#[path = "spectrum_tests.rs"]
mod tests;
