// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fileinfo_decomposes_a_versioned_product_path() {
    let fi = FileInfo::from_path(Path::new(
        "/wa/data/inbox/EUC_VIS_STACK-12345-120-M_20240101T000000.0Z_01.00.fits",
    ));
    assert_eq!(fi.base, "EUC_VIS_STACK-12345-120-M_20240101T000000.0Z_01.00.fits");
    assert_eq!(fi.name, "EUC_VIS_STACK-12345-120-M_20240101T000000");
    assert_eq!(fi.sname, "EUC_VIS_STACK-12345-120-M_20240101T000000.0Z_01.00");
    assert_eq!(fi.ext, "fits");
    assert_eq!(fi.path, PathBuf::from("/wa/data/inbox"));
}

#[test]
fn fileinfo_without_extension() {
    let fi = FileInfo::from_path(Path::new("/tmp/readme"));
    assert_eq!(fi.base, "readme");
    assert_eq!(fi.name, "readme");
    assert_eq!(fi.sname, "readme");
    assert_eq!(fi.ext, "");
    assert_eq!(fi.suffix, "");
}

#[test]
fn relocated_points_at_new_directory() {
    let fi = FileInfo::from_path(Path::new("/wa/data/inbox/a.json"));
    let moved = fi.relocated(Path::new("/wa/data/archive"));
    assert_eq!(moved.full, PathBuf::from("/wa/data/archive/a.json"));
    assert_eq!(moved.path, PathBuf::from("/wa/data/archive"));
    assert_eq!(moved.base, "a.json");
}

#[test]
fn compose_rebuilds_the_basename() {
    let meta = ProductMeta {
        mission: "EUC".into(),
        proc_func: "VIS".into(),
        instance: "STACK-12345-120-M".into(),
        start_time: "20240101T000000.0Z".into(),
        version: "01.00".into(),
        fileinfo: FileInfo { ext: "fits".into(), ..FileInfo::default() },
        ..ProductMeta::default()
    };
    assert_eq!(meta.compose(), "EUC_VIS_STACK-12345-120-M_20240101T000000.0Z_01.00.fits");
}

#[test]
fn compose_omits_missing_version() {
    let meta = ProductMeta {
        mission: "EUC".into(),
        proc_func: "SIM".into(),
        instance: "FOO".into(),
        start_time: "20240101T000000.0Z".into(),
        fileinfo: FileInfo { ext: "fits".into(), ..FileInfo::default() },
        ..ProductMeta::default()
    };
    assert_eq!(meta.compose(), "EUC_SIM_FOO_20240101T000000.0Z.fits");
}

#[test]
fn relocate_updates_fileinfo_and_url() {
    let mut meta = ProductMeta {
        fileinfo: FileInfo::from_path(Path::new("/wa/data/inbox/p.json")),
        url: "file:///wa/data/inbox/p.json".into(),
        ..ProductMeta::default()
    };
    meta.relocate(Path::new("/wa/data/archive"));
    assert_eq!(meta.fileinfo.full, PathBuf::from("/wa/data/archive/p.json"));
    assert_eq!(meta.url, "file:///wa/data/archive/p.json");
}
