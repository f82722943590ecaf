// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Product relocation between work-area zones.
//!
//! Moves fall back to copy+unlink when the rename crosses devices; a
//! move onto an already-existing target drops the source. Hard-link
//! failures propagate so the caller can abort the product.

use ql_core::{ProductMeta, WorkArea};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// EXDEV: rename across filesystems.
const CROSS_DEVICE: i32 = 18;

/// How to carry a product from one zone to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateMethod {
    /// Hard link (zones on the same filesystem)
    Link,
    Symlink,
    Move,
    Copy,
    /// Transfer to another host; not wired to a transport here
    RemoteCopy,
}

/// Errors relocating a product.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("cannot relocate {from} to {to}: {source}")]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("remote copy of {0} is not available on this node")]
    RemoteUnsupported(PathBuf),
}

/// Relocate one file.
pub fn relocate(from: &Path, to: &Path, method: LocateMethod) -> Result<(), LocatorError> {
    let err = |source| LocatorError::Relocate {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    match method {
        LocateMethod::Link => fs::hard_link(from, to).map_err(err),
        LocateMethod::Symlink => {
            #[cfg(unix)]
            {
                std::os::unix::fs::symlink(from, to).map_err(err)
            }
            #[cfg(not(unix))]
            {
                Err(err(std::io::Error::other("symlink unsupported")))
            }
        }
        LocateMethod::Copy => fs::copy(from, to).map(|_| ()).map_err(err),
        LocateMethod::Move => move_file(from, to).map_err(err),
        LocateMethod::RemoteCopy => Err(LocatorError::RemoteUnsupported(from.to_path_buf())),
    }
}

/// Rename, with the two repair paths moves need in practice.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(CROSS_DEVICE) => {
            debug!(from = %from.display(), to = %to.display(), "cross-device move, copying");
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            // Target already holds this product; dropping the source
            // keeps the zones consistent.
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Move-or-link `meta`'s file into a zone directory and update the
/// metadata to its new location.
fn to_zone(
    meta: &mut ProductMeta,
    zone: &Path,
    method: LocateMethod,
) -> Result<(), LocatorError> {
    let target = zone.join(&meta.fileinfo.base);
    let from = meta.fileinfo.full.clone();
    relocate(&from, &target, method)?;
    meta.relocate(zone);
    Ok(())
}

/// Link the product into `data/archive`.
pub fn to_local_archive(
    meta: &mut ProductMeta,
    wa: &WorkArea,
    method: LocateMethod,
) -> Result<(), LocatorError> {
    to_zone(meta, &wa.archive, method)
}

/// Link the product into a task's `in/` folder.
pub fn to_task_input(
    meta: &mut ProductMeta,
    wa: &WorkArea,
    task_id: &str,
    method: LocateMethod,
) -> Result<(), LocatorError> {
    to_zone(meta, &wa.task_folder(task_id).join("in"), method)
}

/// Stage a task log into `data/outbox`.
pub fn to_local_outputs(
    meta: &mut ProductMeta,
    wa: &WorkArea,
    method: LocateMethod,
) -> Result<(), LocatorError> {
    to_zone(meta, &wa.local_outputs, method)
}

/// Stage a task output into `data/inbox` so it can fire new rules.
pub fn to_local_inbox(
    meta: &mut ProductMeta,
    wa: &WorkArea,
    method: LocateMethod,
) -> Result<(), LocatorError> {
    to_zone(meta, &wa.local_inbox, method)
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
