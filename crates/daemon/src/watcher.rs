// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory watcher feeding the ingest queues.
//!
//! Wraps a `notify` watcher over one folder and turns filesystem
//! notifications into `(path, name, is_dir)` events. Draining is capped
//! at [`MAX_EVENTS_PER_DRAIN`] per call so a busy folder cannot starve
//! the loop that polls it.

use notify::event::{CreateKind, EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use ql_core::Queue;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use thiserror::Error;
use tracing::{info, warn};

/// Per-drain cap on consumed events.
pub const MAX_EVENTS_PER_DRAIN: usize = 5;

/// Errors setting up a watcher.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("cannot watch folder {0}: {1}")]
    Watch(PathBuf, #[source] notify::Error),
}

/// One observed directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirWatchEvent {
    /// Folder the entry appeared in
    pub path: PathBuf,
    /// Entry basename
    pub name: String,
    pub is_dir: bool,
}

impl DirWatchEvent {
    /// Full path of the entry.
    pub fn full_path(&self) -> PathBuf {
        self.path.join(&self.name)
    }
}

/// Watches a single folder for new entries.
pub struct DirWatcher {
    // Held to keep the notification subscription alive
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<notify::Result<notify::Event>>,
    dir: PathBuf,
}

impl DirWatcher {
    /// Watch `dir` (non-recursive).
    pub fn new(dir: &Path) -> Result<Self, WatcherError> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)
            .map_err(|e| WatcherError::Watch(dir.to_path_buf(), e))?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::Watch(dir.to_path_buf(), e))?;
        Ok(Self { _watcher: watcher, rx, dir: dir.to_path_buf() })
    }

    /// Folder this watcher observes.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Next arrival event, if one is pending. Never blocks.
    pub fn next_event(&self) -> Option<DirWatchEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(Ok(event)) => {
                    if !is_arrival(&event.kind) {
                        continue;
                    }
                    let Some(path) = event.paths.first() else { continue };
                    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned())
                    else {
                        continue;
                    };
                    return Some(DirWatchEvent {
                        path: self.dir.clone(),
                        is_dir: path.is_dir(),
                        name,
                    });
                }
                Ok(Err(e)) => {
                    warn!(dir = %self.dir.display(), "watch error: {e}");
                }
                Err(mpsc::TryRecvError::Empty) | Err(mpsc::TryRecvError::Disconnected) => {
                    return None;
                }
            }
        }
    }

    /// Drain pending arrivals into `queue`, skipping directories and
    /// consuming at most [`MAX_EVENTS_PER_DRAIN`] events. Returns true
    /// when anything was queued.
    pub fn drain_into(&self, queue: &Queue<String>) -> bool {
        let mut queued = 0;
        while queued < MAX_EVENTS_PER_DRAIN {
            let Some(event) = self.next_event() else { break };
            info!(
                dir = %event.path.display(),
                name = %event.name,
                is_dir = event.is_dir,
                "new directory entry"
            );
            // TODO: handle directories dropped into the inbox
            if !event.is_dir {
                queue.push(event.full_path().display().to_string());
                queued += 1;
            }
        }
        queued > 0
    }
}

/// Files arrive by creation, or by rename/hard-link into the folder.
fn is_arrival(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Create(CreateKind::Any)
            | EventKind::Create(CreateKind::Other)
            | EventKind::Modify(ModifyKind::Name(_))
    )
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
