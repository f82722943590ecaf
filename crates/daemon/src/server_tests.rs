// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn receive_file_stages_then_moves() {
    let dir = tempfile::tempdir().unwrap();
    let wa = WorkArea::with_session_id(dir.path(), "s1").unwrap();
    receive_file(&wa.remote_inbox, &wa.local_inbox, "p.fits", b"bytes").unwrap();
    assert!(wa.local_inbox.join("p.fits").is_file());
    assert!(!wa.remote_inbox.join("p.fits").exists(), "staging copy is moved away");
    assert_eq!(std::fs::read(wa.local_inbox.join("p.fits")).unwrap(), b"bytes");
}

#[test]
fn receive_file_overwrite_keeps_latest_body() {
    let dir = tempfile::tempdir().unwrap();
    let wa = WorkArea::with_session_id(dir.path(), "s1").unwrap();
    receive_file(&wa.remote_inbox, &wa.local_inbox, "p.fits", b"old").unwrap();
    receive_file(&wa.remote_inbox, &wa.local_inbox, "p.fits", b"new").unwrap();
    assert_eq!(std::fs::read(wa.local_inbox.join("p.fits")).unwrap(), b"new");
}

#[parameterized(
    plain = { "EUC_VIS_X_20240101T000000.0Z.fits", true },
    nested = { "a/b.fits", false },
    parent = { "..", false },
    empty = { "", false },
    backslash = { "a\\b", false },
)]
fn upload_names_must_be_basenames(name: &str, ok: bool) {
    assert_eq!(is_plain_basename(name), ok);
}

#[test]
fn router_builds_with_default_limit() {
    let dir = tempfile::tempdir().unwrap();
    let wa = WorkArea::with_session_id(dir.path(), "s1").unwrap();
    let state = ServerState {
        node: "nodeA".into(),
        info: Arc::new(Mutex::new(AgentsInfo::default())),
        tstatus: Arc::new(Mutex::new(BTreeMap::new())),
        wa,
        body_limit: DEFAULT_BODY_LIMIT,
    };
    let _router = router(state);
}
