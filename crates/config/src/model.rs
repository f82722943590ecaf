// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration model and strict JSON loader.

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {0}: {1}")]
    Read(String, #[source] std::io::Error),

    #[error("config file {0} is not valid: {1}")]
    Parse(String, #[source] serde_json::Error),
}

/// Top-level configuration. Unknown top-level keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub general: GeneralConfig,
    pub network: NetworkConfig,
    pub orchestration: OrchestrationConfig,
    pub db: DbConfig,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(path.display().to_string(), e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Work-area root; always overridden by the CLI `-w` flag
    #[serde(rename = "workArea", default)]
    pub work_area: Option<String>,
    /// Milliseconds between main-loop wakeups
    #[serde(rename = "masterHeartBeat", default = "default_heart_beat")]
    pub master_heart_beat: u64,
}

fn default_heart_beat() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub commander: String,
    /// Node name -> node description; insertion order defines node indices
    #[serde(rename = "processingNodes")]
    pub processing_nodes: IndexMap<String, NodeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub address: String,
    #[serde(deserialize_with = "port_from_int_or_string")]
    pub port: u16,
    pub agents: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    pub rules: Vec<RuleConfig>,
    /// Processor key -> processor config name
    pub processors: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    /// Comma-separated product types this rule fires on
    pub inputs: String,
    /// Processor key, resolved against the processors map
    pub processing: String,
}

impl RuleConfig {
    /// Whether this rule's input list contains `product_type`.
    pub fn matches(&self, product_type: &str) -> bool {
        self.inputs.split(',').any(|t| t.trim() == product_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub host: String,
    #[serde(deserialize_with = "port_from_int_or_string")]
    pub port: u16,
    pub name: String,
    pub user: String,
    pub pwd: String,
}

impl DbConfig {
    /// Render as a Postgres connection URL.
    pub fn url(&self) -> String {
        format!("postgres://{}:{}@{}:{}/{}", self.user, self.pwd, self.host, self.port, self.name)
    }
}

/// Accept both `8080` and `"8080"` for port values.
fn port_from_int_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(u16),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(p) => Ok(p),
        IntOrString::Str(s) => {
            s.parse().map_err(|_| D::Error::custom(format!("invalid port value '{s}'")))
        }
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
pub(crate) mod tests;
