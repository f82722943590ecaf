// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn time_tag_has_compact_shape() {
    let t = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(format_time_tag(t), "20240102T030405");
}

#[test]
fn time_tag_uses_the_current_instant() {
    let tag = time_tag();
    assert_eq!(tag.len(), 15);
    assert_eq!(tag.as_bytes()[8], b'T');
    assert!(tag.starts_with("20"));
}

#[test]
fn time_tag_converts_to_timestamp() {
    assert_eq!(time_tag_to_timestamp("20240102T030405"), "2024-01-02 03:04:05");
}

#[test]
fn unparseable_tag_passes_through() {
    assert_eq!(time_tag_to_timestamp("not-a-tag"), "not-a-tag");
    assert_eq!(time_tag_to_timestamp(""), "");
}
