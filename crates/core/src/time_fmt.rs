// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The compact time-tag format used for session ids and task ids.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Compact UTC time tag with second granularity: `YYYYMMDDThhmmss`.
///
/// Session directories and task ids embed this tag.
pub fn time_tag() -> String {
    format_time_tag(Utc::now())
}

/// Render a specific instant as a time tag.
pub fn format_time_tag(t: DateTime<Utc>) -> String {
    t.format("%Y%m%dT%H%M%S").to_string()
}

/// Convert a time tag back to a SQL-style timestamp string
/// (`YYYY-MM-DD hh:mm:ss`). Tags that do not parse come back unchanged.
pub fn time_tag_to_timestamp(tag: &str) -> String {
    match NaiveDateTime::parse_from_str(tag, "%Y%m%dT%H%M%S") {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => tag.to_string(),
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
