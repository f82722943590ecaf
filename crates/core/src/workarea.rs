// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical work-area filesystem layout.
//!
//! The layout is fixed relative to a root supplied on the command line:
//!
//! ```text
//! <root>/bin                processor binaries, one folder per processor
//! <root>/data/inbox         products awaiting scheduling
//! <root>/data/outbox        staged outputs awaiting archival
//! <root>/data/archive       archived products
//! <root>/data/reproc        products dropped for reprocessing
//! <root>/server             HTTP staging area
//! <root>/server/inbox       raw uploads bound for data/inbox
//! <root>/server/outputs     raw uploads bound for data/archive
//! <root>/run/<session>/tsk  per-task folders for this session
//! <root>/run/<session>/log  session log files
//! ```
//!
//! The session id is the startup time tag and never changes for the
//! process lifetime. The whole structure is read-only after `new`.

use crate::time_fmt::time_tag;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors creating the work-area tree.
#[derive(Debug, Error)]
pub enum WorkAreaError {
    #[error("cannot create work area folder {0}: {1}")]
    Create(PathBuf, #[source] std::io::Error),
}

/// Resolved work-area paths for one node process.
#[derive(Debug, Clone)]
pub struct WorkArea {
    pub root: PathBuf,
    /// Processor binaries (`bin`)
    pub proc_area: PathBuf,
    pub local_inbox: PathBuf,
    pub local_outputs: PathBuf,
    pub archive: PathBuf,
    pub reproc: PathBuf,
    /// HTTP server staging root
    pub server_base: PathBuf,
    pub remote_inbox: PathBuf,
    pub remote_outputs: PathBuf,
    pub run: PathBuf,
    pub session_id: String,
    pub session_dir: PathBuf,
    /// Task folders root for this session
    pub tasks: PathBuf,
    /// Session log directory
    pub logs: PathBuf,
}

impl WorkArea {
    /// Build the layout under `root` with a fresh session id and create
    /// every directory.
    pub fn new(root: &Path) -> Result<Self, WorkAreaError> {
        Self::with_session_id(root, &time_tag())
    }

    /// Build the layout with an explicit session id.
    pub fn with_session_id(root: &Path, session_id: &str) -> Result<Self, WorkAreaError> {
        let run = root.join("run");
        let session_dir = run.join(session_id);
        let wa = Self {
            root: root.to_path_buf(),
            proc_area: root.join("bin"),
            local_inbox: root.join("data/inbox"),
            local_outputs: root.join("data/outbox"),
            archive: root.join("data/archive"),
            reproc: root.join("data/reproc"),
            server_base: root.join("server"),
            remote_inbox: root.join("server/inbox"),
            remote_outputs: root.join("server/outputs"),
            tasks: session_dir.join("tsk"),
            logs: session_dir.join("log"),
            run,
            session_id: session_id.to_string(),
            session_dir,
        };
        for p in [
            &wa.proc_area,
            &wa.local_inbox,
            &wa.local_outputs,
            &wa.archive,
            &wa.reproc,
            &wa.remote_inbox,
            &wa.remote_outputs,
            &wa.tasks,
            &wa.logs,
        ] {
            fs::create_dir_all(p).map_err(|e| WorkAreaError::Create(p.clone(), e))?;
        }
        Ok(wa)
    }

    /// Folder owned by one task for its lifetime.
    pub fn task_folder(&self, task_id: &str) -> PathBuf {
        self.tasks.join(task_id)
    }
}

impl std::fmt::Display for WorkArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "root ........: {}", self.root.display())?;
        writeln!(f, "proc area ...: {}", self.proc_area.display())?;
        writeln!(f, "inbox .......: {}", self.local_inbox.display())?;
        writeln!(f, "outbox ......: {}", self.local_outputs.display())?;
        writeln!(f, "archive .....: {}", self.archive.display())?;
        writeln!(f, "reproc ......: {}", self.reproc.display())?;
        writeln!(f, "server ......: {}", self.server_base.display())?;
        writeln!(f, "session .....: {}", self.session_id)?;
        writeln!(f, "tasks .......: {}", self.tasks.display())?;
        write!(f, "logs ........: {}", self.logs.display())
    }
}

#[cfg(test)]
#[path = "workarea_tests.rs"]
mod tests;
