// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version tagging of products arriving without a version suffix.

use ql_core::{FileNameSpec, FileVersion};

#[test]
fn versionless_product_is_renamed_and_reparsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("EUC_SIM_FOO_20240101T000000.0Z.fits");
    std::fs::write(&path, b"x").unwrap();

    let parsed = FileNameSpec::new().parse(&path).unwrap();
    assert!(parsed.needs_version);

    // The commander assigns the next counter value as the major
    let version = FileVersion::new(2, 0);
    let mut renamed = parsed.meta.clone();
    renamed.version = version.to_string();
    let new_base = renamed.compose();
    assert_eq!(new_base, "EUC_SIM_FOO_20240101T000000.0Z_02.00.fits");

    let target = dir.path().join(&new_base);
    std::fs::rename(&path, &target).unwrap();

    // The renamed file parses cleanly and needs no further versioning
    let again = FileNameSpec::new().parse(&target).unwrap();
    assert!(!again.needs_version);
    assert_eq!(again.meta.version, "02.00");
    assert_eq!(again.meta.signature, parsed.meta.signature);
    assert!(!path.exists(), "exactly one file remains after renaming");
}

#[test]
fn duplicate_signature_bumps_the_minor() {
    let mut v = FileVersion::parse("02.00");
    v.incr_minor();
    assert_eq!(v.to_string(), "02.01");
}
