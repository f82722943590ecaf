// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsed view of the cluster topology.
//!
//! Node indices follow the configuration order of
//! `network.processingNodes`. Agent names are derived, not configured:
//! node k (1-based) with m agents owns `TskAgent_<k:02>_<01..m:02>`.

use crate::model::Config;
use indexmap::IndexMap;
use thiserror::Error;

/// Errors deriving the network view.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("this node '{0}' is not listed under network.processingNodes")]
    UnknownNode(String),

    #[error("commander '{0}' is not listed under network.processingNodes")]
    UnknownCommander(String),
}

/// Derived cluster topology for one node process.
#[derive(Debug, Clone)]
pub struct ProcessingNetwork {
    pub node_names: Vec<String>,
    pub nodes_but_commander: Vec<String>,
    pub node_addresses: Vec<String>,
    pub node_ports: Vec<u16>,
    pub node_server_urls: Vec<String>,
    pub node_num_agents: Vec<u32>,
    pub num_nodes: usize,
    pub commander: String,
    pub commander_idx: usize,
    pub this_node: String,
    pub this_node_idx: usize,
    pub this_is_commander: bool,
    pub this_node_num_agents: u32,
    /// Ordered agent names per node
    pub node_agents: IndexMap<String, Vec<String>>,
}

impl ProcessingNetwork {
    /// Derive the topology view; `this_node` must appear in the node map.
    pub fn new(cfg: &Config, this_node: &str) -> Result<Self, NetworkError> {
        let nodes = &cfg.network.processing_nodes;
        let commander = cfg.network.commander.clone();

        let node_names: Vec<String> = nodes.keys().cloned().collect();
        let commander_idx = node_names
            .iter()
            .position(|n| *n == commander)
            .ok_or_else(|| NetworkError::UnknownCommander(commander.clone()))?;
        let this_node_idx = node_names
            .iter()
            .position(|n| n == this_node)
            .ok_or_else(|| NetworkError::UnknownNode(this_node.to_string()))?;

        let node_addresses: Vec<String> = nodes.values().map(|n| n.address.clone()).collect();
        let node_ports: Vec<u16> = nodes.values().map(|n| n.port).collect();
        let node_server_urls = node_addresses
            .iter()
            .zip(&node_ports)
            .map(|(a, p)| format!("http://{a}:{p}"))
            .collect();
        let node_num_agents: Vec<u32> = nodes.values().map(|n| n.agents).collect();

        let node_agents = node_names
            .iter()
            .enumerate()
            .map(|(k, name)| {
                let agents =
                    (0..node_num_agents[k]).map(|i| agent_name(k, i as usize)).collect();
                (name.clone(), agents)
            })
            .collect();

        Ok(Self {
            nodes_but_commander: node_names.iter().filter(|n| **n != commander).cloned().collect(),
            num_nodes: node_names.len(),
            this_is_commander: this_node == commander,
            this_node: this_node.to_string(),
            this_node_num_agents: node_num_agents[this_node_idx],
            node_names,
            node_addresses,
            node_ports,
            node_server_urls,
            node_num_agents,
            commander,
            commander_idx,
            this_node_idx,
            node_agents,
        })
    }

    /// Agent names owned by this node, in slot order.
    pub fn this_node_agents(&self) -> &[String] {
        self.node_agents.get(&self.this_node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Base server URL (`http://addr:port`) for node `idx`.
    pub fn server_url(&self, idx: usize) -> Option<&str> {
        self.node_server_urls.get(idx).map(String::as_str)
    }
}

/// Derived agent name for 0-based node and slot indices.
fn agent_name(node_idx: usize, agent_idx: usize) -> String {
    format!("TskAgent_{:02}_{:02}", node_idx + 1, agent_idx + 1)
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
