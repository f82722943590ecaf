// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processor-config evaluation before a container launch.
//!
//! The per-task config file is a flat JSON object of strings. Three
//! keys are path expressions (`input`, `output`, `log`); `output` and
//! `log` may instead be substitution directives of the form
//! `{from_var:a=>b,c=>d}`, which take the current value of `from_var`,
//! apply each `LHS=>RHS` as replace-all, and re-split the result on
//! whitespace. `{key}` placeholders in `args` expand from the effective
//! config.

use crate::containers::{VolumeMap, IMAGE_PROC_PATH, IMAGE_RUN_PATH};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors preparing a task for launch.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("cannot open processor config file {0}: {1}")]
    CfgRead(PathBuf, #[source] std::io::Error),

    #[error("processor config file {0} is not valid JSON: {1}")]
    CfgParse(PathBuf, #[source] serde_json::Error),

    #[error("processor config lacks key '{0}'")]
    MissingKey(String),

    #[error("no input files provided to the processor {0}")]
    NoInputs(String),

    #[error("bad file pattern '{0}'")]
    BadPattern(String),

    #[error("bad substitution rule '{0}'")]
    BadRule(String),
}

/// Everything needed to launch a task's container.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPrep {
    pub image: String,
    pub exe: String,
    pub args: Vec<String>,
    /// Working directory inside the container
    pub workdir: String,
    pub mapping: VolumeMap,
    /// Basename summary injected into inspect output
    pub io: Value,
}

/// Evaluate the processor config inside `task_folder` and assemble the
/// launch parameters.
pub fn prepare(
    task_id: &str,
    task_folder: &Path,
    processor: &str,
    proc_area: &Path,
) -> Result<TaskPrep, PrepError> {
    let cfg_file = task_folder.join(format!("{processor}.cfg"));
    let text = std::fs::read_to_string(&cfg_file)
        .map_err(|e| PrepError::CfgRead(cfg_file.clone(), e))?;
    let mut cfg: Value =
        serde_json::from_str(&text).map_err(|e| PrepError::CfgParse(cfg_file.clone(), e))?;

    let inputs = expand_files(task_folder, &get_str(&cfg, "input")?)?;
    if inputs.is_empty() {
        return Err(PrepError::NoInputs(processor.to_string()));
    }

    let output_expr = get_str(&cfg, "output")?;
    let outputs = if is_substitution_rules(&output_expr) {
        apply_rules(&output_expr, &cfg, &inputs, &[], &[])?
    } else {
        expand_files(task_folder, &output_expr)?
    };

    let log_expr = get_str(&cfg, "log")?;
    let logs = if is_substitution_rules(&log_expr) {
        apply_rules(&log_expr, &cfg, &inputs, &outputs, &[])?
    } else {
        expand_files(task_folder, &log_expr)?
    };

    let io = serde_json::json!({
        "input": basenames(&inputs).join(","),
        "output": basenames(&outputs).join(","),
        "p_log": basenames(&logs).join(","),
    });

    // Later expansions ({key} placeholders in args) see the effective,
    // comma-joined lists rather than the original patterns.
    cfg["input"] = Value::String(inputs.join(","));
    cfg["output"] = Value::String(outputs.join(","));
    cfg["log"] = Value::String(logs.join(","));

    let p_processor = get_str(&cfg, "processor")?;
    let script = get_str(&cfg, "script")?;
    let image = get_str(&cfg, "image")?;
    let exe = get_str(&cfg, "exe")?;

    let mut args_str = get_str(&cfg, "args")?;
    if let Some(obj) = cfg.as_object() {
        for (key, value) in obj {
            if let Some(v) = value.as_str() {
                args_str = args_str.replace(&format!("{{{key}}}"), v);
            }
        }
    }

    let workdir = format!("{IMAGE_RUN_PATH}/{task_id}");
    let mut args = vec![format!("{IMAGE_PROC_PATH}/{p_processor}/{script}")];
    args.extend(args_str.split_whitespace().map(str::to_string));

    Ok(TaskPrep {
        image,
        exe,
        args,
        mapping: vec![
            (task_folder.to_path_buf(), format!("{workdir}:rw")),
            (proc_area.to_path_buf(), IMAGE_PROC_PATH.to_string()),
        ],
        workdir,
        io,
    })
}

fn get_str(cfg: &Value, key: &str) -> Result<String, PrepError> {
    cfg.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| PrepError::MissingKey(key.to_string()))
}

fn basenames(paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            Path::new(p)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.clone())
        })
        .collect()
}

/// Expand a file pattern (e.g. `in/*.fits`) relative to the task folder.
fn expand_files(base: &Path, pattern: &str) -> Result<Vec<String>, PrepError> {
    let full = if Path::new(pattern).is_absolute() {
        PathBuf::from(pattern)
    } else {
        base.join(pattern)
    };
    let pattern_str =
        full.to_str().ok_or_else(|| PrepError::BadPattern(pattern.to_string()))?;
    let paths = glob::glob(pattern_str)
        .map_err(|_| PrepError::BadPattern(pattern.to_string()))?;
    Ok(paths
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .map(|p| p.display().to_string())
        .collect())
}

/// Whether a config value is a substitution directive.
pub(crate) fn is_substitution_rules(item: &str) -> bool {
    item.starts_with('{') && item.ends_with('}')
}

/// Evaluate a `{from_var:a=>b,c=>d}` directive.
pub(crate) fn apply_rules(
    item: &str,
    cfg: &Value,
    inputs: &[String],
    outputs: &[String],
    logs: &[String],
) -> Result<Vec<String>, PrepError> {
    let body = &item[1..item.len() - 1];
    let (from_var, rules) =
        body.split_once(':').ok_or_else(|| PrepError::BadRule(item.to_string()))?;

    let mut value = match from_var {
        "input" => inputs.join(" "),
        "output" => outputs.join(" "),
        "log" => logs.join(" "),
        key => get_str(cfg, key)?,
    };

    for rule in rules.split(',') {
        let (from, to) =
            rule.split_once("=>").ok_or_else(|| PrepError::BadRule(rule.to_string()))?;
        value = value.replace(from, to);
    }

    Ok(value.split_whitespace().map(str::to_string).collect())
}

#[cfg(test)]
#[path = "prep_tests.rs"]
mod tests;
