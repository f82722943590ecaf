// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-component product version (`MM.mm`).

use serde::{Deserialize, Serialize};

/// A product version: major and minor counters rendered as `%02d.%02d`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileVersion {
    major: u32,
    minor: u32,
}

impl FileVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a `MM.mm` string; anything unparseable yields `00.00`.
    pub fn parse(s: &str) -> Self {
        match s.split_once('.') {
            Some((mj, mn)) => {
                Self { major: mj.parse().unwrap_or(0), minor: mn.parse().unwrap_or(0) }
            }
            None => Self::default(),
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Increment the minor counter; rolls over into major past 99.
    pub fn incr_minor(&mut self) {
        self.minor += 1;
        if self.minor > 99 {
            self.minor = 0;
            self.major += 1;
        }
    }

    /// Increment the major counter, resetting minor.
    pub fn incr_major(&mut self) {
        self.major += 1;
        self.minor = 0;
    }
}

impl std::fmt::Display for FileVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}.{:02}", self.major, self.minor)
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
