// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime contract and its docker-CLI implementation.
//!
//! The runtime is only ever driven through four operations: launch
//! detached, inspect by id, kill by id, remove by id. Inspect accepts a
//! Go-template format string; [`inspect_template`] builds the template
//! that normalizes the runtime state into a task status under the
//! `Task_Status` key.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Output;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Task-folder mount point inside the container.
pub const IMAGE_RUN_PATH: &str = "/qpf/run";

/// Processor-area mount point inside the container.
pub const IMAGE_PROC_PATH: &str = "/qlabin";

/// Errors from the container runtime.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("cannot launch container: {cmd_line}: {detail}")]
    Launch { cmd_line: String, detail: String },

    #[error("cannot inspect container {0}: {1}")]
    Inspect(String, String),

    #[error("cannot kill container {0}: {1}")]
    Kill(String, String),

    #[error("cannot remove container {0}: {1}")]
    Remove(String, String),

    #[error("container runtime not invocable: {0}")]
    Io(#[from] std::io::Error),
}

/// Volume mapping `host_path -> container_path[:mode]`.
pub type VolumeMap = Vec<(PathBuf, String)>;

/// The contract the agents hold against the container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Launch a detached container; returns the container id.
    async fn create(
        &self,
        image: &str,
        opts: &[String],
        mapping: &VolumeMap,
        exe: &str,
        args: &[String],
    ) -> Result<String, ContainerError>;

    /// Inspect a container, optionally through a format template.
    async fn inspect(&self, id: &str, format: Option<&str>)
        -> Result<String, ContainerError>;

    async fn kill(&self, id: &str) -> Result<(), ContainerError>;

    async fn remove(&self, id: &str) -> Result<(), ContainerError>;
}

/// Docker-CLI-backed runtime.
pub struct DockerCli {
    binary: PathBuf,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self { binary: PathBuf::from("docker") }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    async fn run(&self, args: &[String]) -> Result<Output, ContainerError> {
        debug!(binary = %self.binary.display(), ?args, "container runtime call");
        Ok(Command::new(&self.binary).args(args).output().await?)
    }
}

/// Arguments for `docker run` with the fixed launch options.
pub fn build_run_args(
    image: &str,
    opts: &[String],
    mapping: &VolumeMap,
    exe: &str,
    args: &[String],
) -> Vec<String> {
    let mut cmd = vec![
        "run".to_string(),
        "--detach".to_string(),
        "--publish-all".to_string(),
        "--privileged=true".to_string(),
    ];
    cmd.extend(opts.iter().cloned());
    for (host, container) in mapping {
        cmd.push("-v".to_string());
        cmd.push(format!("{}:{}", host.display(), container));
    }
    cmd.push(image.to_string());
    cmd.push(exe.to_string());
    cmd.extend(args.iter().cloned());
    cmd
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn create(
        &self,
        image: &str,
        opts: &[String],
        mapping: &VolumeMap,
        exe: &str,
        args: &[String],
    ) -> Result<String, ContainerError> {
        let run_args = build_run_args(image, opts, mapping, exe, args);
        let output = self.run(&run_args).await?;
        if !output.status.success() {
            return Err(ContainerError::Launch {
                cmd_line: format!("{} {}", self.binary.display(), run_args.join(" ")),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn inspect(
        &self,
        id: &str,
        format: Option<&str>,
    ) -> Result<String, ContainerError> {
        let mut args = vec!["inspect".to_string()];
        if let Some(fmt) = format {
            args.push("--format".to_string());
            args.push(fmt.to_string());
        }
        args.push(id.to_string());
        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(ContainerError::Inspect(
                id.to_string(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn kill(&self, id: &str) -> Result<(), ContainerError> {
        let output = self.run(&["kill".to_string(), id.to_string()]).await?;
        if !output.status.success() {
            return Err(ContainerError::Kill(
                id.to_string(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        let output = self.run(&["rm".to_string(), id.to_string()]).await?;
        if !output.status.success() {
            return Err(ContainerError::Remove(
                id.to_string(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

/// Inspect template that classifies the container state into one of the
/// task status names under `Task_Status`.
///
/// Exit codes: 0 is FINISHED, 129..159 (signal region) is STOPPED —
/// or RUNNING while this agent is quitting, so a soft shutdown does not
/// misclassify its own kills — and everything else is FAILED.
pub fn inspect_template(quitting: bool) -> String {
    let signal_status = if quitting { "RUNNING" } else { "STOPPED" };
    format!(
        "{{{{- define \"CheckCode\" -}}}}\
         {{{{- $c := printf \"%s\" .ExitCode -}}}}\
         {{{{- if eq $c \"0\" -}}}}\"FINISHED\"\
         {{{{- else if le $c \"128\" -}}}}\"FAILED\"\
         {{{{- else if ge $c \"160\" -}}}}\"FAILED\"\
         {{{{- else -}}}}\"{signal_status}\"\
         {{{{- end -}}}}\
         {{{{- end -}}}}\
         {{{{- define \"TaskStatus\" -}}}}\
         {{{{- if eq .Status \"running\" -}}}}\"RUNNING\"\
         {{{{- else if eq .Status \"paused\" -}}}}\"PAUSED\"\
         {{{{- else if eq .Status \"created\" -}}}}\"ABORTED\"\
         {{{{- else if eq .Status \"dead\" -}}}}\"STOPPED\"\
         {{{{- else if eq .Status \"exited\" -}}}}{{{{- template \"CheckCode\" . -}}}}\
         {{{{- else -}}}}\"UNKNOWN_STATE\"\
         {{{{- end -}}}}\
         {{{{- end -}}}}\
         {{\"Id\":{{{{- json .Id -}}}}\
         ,\"State\":{{{{- json .State -}}}}\
         ,\"Path\":{{{{- json .Path -}}}}\
         ,\"Args\":{{{{- json .Args -}}}}\
         ,\"Config\":{{{{- json .Config -}}}}\
         ,\"Task_Status\":{{{{template \"TaskStatus\" .State}}}}}}"
    )
}

#[cfg(test)]
#[path = "containers_tests.rs"]
mod tests;
