// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Product metadata: a file on disk plus the fields derived from its name.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Decomposition of a product path.
///
/// For `/some/dir/myfile.01.00.fits`:
/// - `base`   => `myfile.01.00.fits`
/// - `name`   => `myfile`
/// - `sname`  => `myfile.01.00`
/// - `suffix` => `01.00.fits`
/// - `ext`    => `fits`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub full: PathBuf,
    pub path: PathBuf,
    pub base: String,
    pub name: String,
    pub sname: String,
    pub suffix: String,
    pub ext: String,
}

impl FileInfo {
    /// Decompose a path into its naming components.
    pub fn from_path(full: &Path) -> Self {
        let base = full.file_name().map(|b| b.to_string_lossy().into_owned()).unwrap_or_default();
        let dir = full.parent().map(Path::to_path_buf).unwrap_or_default();
        let (name, suffix) = match base.split_once('.') {
            Some((n, s)) => (n.to_string(), s.to_string()),
            None => (base.clone(), String::new()),
        };
        let (sname, ext) = match base.rsplit_once('.') {
            Some((s, e)) => (s.to_string(), e.to_string()),
            None => (base.clone(), String::new()),
        };
        Self { full: full.to_path_buf(), path: dir, base, name, sname, suffix, ext }
    }

    /// Re-point this entry at `dir/base` after a relocation.
    pub fn relocated(&self, dir: &Path) -> Self {
        let mut fi = self.clone();
        fi.full = dir.join(&self.base);
        fi.path = dir.to_path_buf();
        fi
    }
}

/// Structured metadata of a product, as extracted by the name parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductMeta {
    /// Basename, used as the product id
    pub id: String,
    pub fileinfo: FileInfo,
    pub url: String,
    pub mission: String,
    pub proc_func: String,
    pub creator: String,
    pub instance: String,
    pub start_time: String,
    pub end_time: String,
    pub version: String,
    pub obs_id: String,
    pub obs_mode: String,
    pub exposure: u32,
    pub spectral_band: String,
    pub data_type: String,
    pub additional: String,
    /// `proc_func` or `proc_func_creator`
    #[serde(rename = "type")]
    pub product_type: String,
    /// Last three characters of `product_type`
    pub instrument: String,
    /// `obs_id-exposure-obs_mode`
    pub signature: String,
    /// Extension, uppercased
    pub format: String,
    pub size: u64,
    pub exists: bool,
    /// Opaque header contents for formats that carry them (FITS)
    pub meta: Option<String>,
}

impl ProductMeta {
    /// Rebuild the canonical basename from the parsed fields.
    ///
    /// Parsing the composed name yields the same structured fields
    /// (`parse -> compose -> parse` is the identity on them).
    pub fn compose(&self) -> String {
        let mut name =
            format!("{}_{}_{}_{}", self.mission, self.proc_func, self.instance, self.start_time);
        if !self.version.is_empty() {
            name.push('_');
            name.push_str(&self.version);
        }
        name.push('.');
        name.push_str(&self.fileinfo.ext);
        name
    }

    /// Record a relocation of the underlying file into `dir`.
    pub fn relocate(&mut self, dir: &Path) {
        self.fileinfo = self.fileinfo.relocated(dir);
        self.url = format!("file://{}", self.fileinfo.full.display());
    }
}

#[cfg(test)]
#[path = "product_tests.rs"]
mod tests;
