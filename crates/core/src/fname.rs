// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Product filename grammar.
//!
//! Basenames follow `MISSION_FUNC_INSTANCE_DATE[_MAJOR.MINOR].EXT`
//! where MISSION is 3 uppercase letters, FUNC is 3 alphanumerics,
//! INSTANCE is a dash-separated token list, DATE is
//! `YYYYMMDDThh.mm.ss.sssZ` and the version suffix is optional.
//! A missing version sets `needs_version` so the commander can assign
//! one from the archive's version counter.

use crate::product::{FileInfo, ProductMeta};
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[allow(clippy::expect_used)]
static BNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([A-Z]{3})_([A-Z0-9]{3})_([^_]+)_(20[0-9]+T[.0-9]+Z)(?:_([0-9]+\.[0-9]+))?$",
    )
    .expect("constant regex pattern is valid")
});

/// Single-letter spectral band tokens.
///
/// `M` is deliberately absent: a lone `M` in the instance is an
/// observation-mode flag, not a band.
const SPECTRAL_BANDS: &str = "UBVRIJHKLNQGZY";

/// Known creator tokens (processing functions that re-emit products).
const CREATORS: [&str; 3] = ["NIR", "SIR", "VIS"];

/// Known data-type tokens.
const DATA_TYPES: [&str; 9] =
    ["CAT", "TRANS", "STACK", "MASK", "MAP", "PSF", "SPE1D", "MAP2DCOR", "TIPS"];

/// Digits-only instance tokens at least this long are observation ids;
/// shorter ones are exposure durations.
const OBS_ID_MIN_LEN: usize = 5;

/// Reads the in-file header of a product, when the format carries one.
pub trait HeaderReader: Send + Sync {
    /// Return the header contents, or `None` if they cannot be read.
    fn read_header(&self, path: &Path) -> Option<String>;
}

/// Header reader for FITS-like files: returns the printable prefix of
/// the first 2880-byte header block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockHeaderReader;

impl HeaderReader for BlockHeaderReader {
    fn read_header(&self, path: &Path) -> Option<String> {
        let mut buf = [0u8; 2880];
        let mut f = fs::File::open(path).ok()?;
        let n = f.read(&mut buf).ok()?;
        let printable: String = buf[..n]
            .iter()
            .take_while(|b| b.is_ascii() && !b.is_ascii_control())
            .map(|b| *b as char)
            .collect();
        let trimmed = printable.trim_end().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

/// Errors from filename parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("'{0}' does not match the product naming convention")]
    NotAProduct(String),
}

/// Result of a successful parse.
#[derive(Debug, Clone)]
pub struct ParsedProduct {
    pub meta: ProductMeta,
    /// True when the name carries no version suffix
    pub needs_version: bool,
}

/// Parser for product filenames.
pub struct FileNameSpec {
    header_reader: Box<dyn HeaderReader>,
}

impl Default for FileNameSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl FileNameSpec {
    pub fn new() -> Self {
        Self { header_reader: Box::new(BlockHeaderReader) }
    }

    pub fn with_header_reader(reader: Box<dyn HeaderReader>) -> Self {
        Self { header_reader: reader }
    }

    /// Parse a product path into structured metadata.
    ///
    /// The file need not exist; `exists`/`size`/`meta` are only filled
    /// in when it does.
    pub fn parse(&self, path: &Path) -> Result<ParsedProduct, ParseError> {
        let fileinfo = FileInfo::from_path(path);
        let caps = BNAME_RE
            .captures(&fileinfo.sname)
            .ok_or_else(|| ParseError::NotAProduct(fileinfo.base.clone()))?;

        let mission = caps[1].to_string();
        let proc_func = caps[2].to_string();
        let instance = caps[3].to_string();
        let date = caps[4].to_string();
        let version = caps.get(5).map(|m| m.as_str().to_string()).unwrap_or_default();
        let needs_version = version.is_empty();

        let mut meta = ProductMeta {
            id: fileinfo.base.clone(),
            url: format!("file://{}", fileinfo.full.display()),
            format: fileinfo.ext.to_uppercase(),
            mission,
            creator: proc_func.clone(),
            proc_func,
            instance: instance.clone(),
            start_time: date.clone(),
            end_time: date,
            version,
            fileinfo,
            ..ProductMeta::default()
        };

        classify_instance(&instance, &mut meta);

        meta.product_type = format!("{}_{}", meta.proc_func, meta.creator);
        let t = &meta.product_type;
        meta.instrument = t[t.len().saturating_sub(3)..].to_string();

        if let Ok(md) = fs::metadata(&meta.fileinfo.full) {
            meta.exists = true;
            meta.size = md.len();
            if meta.format == "FITS" {
                meta.meta = Some(
                    self.header_reader
                        .read_header(&meta.fileinfo.full)
                        .unwrap_or_else(|| "<none>".to_string()),
                );
            }
        }

        Ok(ParsedProduct { meta, needs_version })
    }
}

/// Classify the dash-separated instance tokens into metadata fields.
fn classify_instance(instance: &str, meta: &mut ProductMeta) {
    let mut additional = Vec::new();
    let mut exposure = String::new();

    for token in instance.split('-').filter(|t| !t.is_empty()) {
        if token.chars().all(|c| c.is_ascii_digit()) {
            if token.len() >= OBS_ID_MIN_LEN {
                meta.obs_id = token.to_string();
            } else {
                exposure = token.to_string();
                meta.exposure = token.parse().unwrap_or(0);
            }
        } else if token.len() == 1 {
            if SPECTRAL_BANDS.contains(token) {
                meta.spectral_band = token.to_string();
            } else {
                meta.obs_mode = token.to_string();
            }
        } else if CREATORS.contains(&token) {
            meta.creator = token.to_string();
        } else if DATA_TYPES.contains(&token) {
            meta.data_type = token.to_string();
        } else {
            additional.push(token);
        }
    }

    meta.additional = additional.join("-");
    meta.signature = format!("{}-{}-{}", meta.obs_id, exposure, meta.obs_mode);
}

#[cfg(test)]
#[path = "fname_tests.rs"]
mod tests;
