// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task orchestrator: product type -> rules -> processors.
//!
//! Pure and deterministic; rules are read once from configuration.

use crate::manager::TaskManager;
use ql_config::{OrchestrationConfig, RuleConfig};
use ql_core::ProductMeta;
use tracing::{error, info, warn};

/// A rule that matched a product, with its processor resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredRule {
    pub name: String,
    pub processor: String,
}

/// Resolves products to processors through the rule table.
pub struct TaskOrchestrator {
    rules: Vec<RuleConfig>,
    processors: indexmap::IndexMap<String, String>,
}

impl TaskOrchestrator {
    pub fn new(orchestration: &OrchestrationConfig) -> Self {
        Self {
            rules: orchestration.rules.clone(),
            processors: orchestration.processors.clone(),
        }
    }

    /// Rules fired by `product_type`, in rule order. A rule whose
    /// processor key is unknown is skipped without failing the others.
    pub fn check_rules(&self, product_type: &str) -> Vec<FiredRule> {
        let mut fired = Vec::new();
        for rule in &self.rules {
            if !rule.matches(product_type) {
                continue;
            }
            match self.processors.get(&rule.processing) {
                Some(processor) => {
                    info!(rule = %rule.name, product_type, "rule fired");
                    fired.push(FiredRule {
                        name: rule.name.clone(),
                        processor: processor.clone(),
                    });
                }
                None => {
                    error!(
                        rule = %rule.name,
                        processor = %rule.processing,
                        "cannot find processor config for fired rule"
                    );
                }
            }
        }
        fired
    }

    /// Schedule a task per fired rule. Returns true iff at least one
    /// rule fired.
    pub fn schedule(&self, meta: &mut ProductMeta, manager: &TaskManager) -> bool {
        let fired = self.check_rules(&meta.product_type);
        if fired.is_empty() {
            warn!(
                product_type = %meta.product_type,
                product = %meta.fileinfo.base,
                "no rule found for product"
            );
            return false;
        }
        for rule in &fired {
            if let Err(e) = manager.schedule(meta, &rule.processor) {
                error!(rule = %rule.name, "cannot schedule task: {e}");
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
