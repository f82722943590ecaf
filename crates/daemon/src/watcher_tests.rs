// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn wait_for<F: FnMut() -> bool>(mut cond: F) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn sees_a_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let watcher = DirWatcher::new(dir.path()).unwrap();
    std::fs::write(dir.path().join("a.fits"), b"x").unwrap();

    let mut seen = None;
    wait_for(|| {
        seen = watcher.next_event();
        seen.is_some()
    });
    let event = seen.expect("watcher should observe the new file");
    assert_eq!(event.name, "a.fits");
    assert!(!event.is_dir);
    assert_eq!(event.full_path(), dir.path().join("a.fits"));
}

#[test]
fn drain_skips_directories_and_queues_files() {
    let dir = tempfile::tempdir().unwrap();
    let watcher = DirWatcher::new(dir.path()).unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("b.fits"), b"x").unwrap();

    let queue = Queue::new();
    wait_for(|| watcher.drain_into(&queue) || !queue.is_empty());
    let paths = queue.drain();
    assert_eq!(paths, vec![dir.path().join("b.fits").display().to_string()]);
}

#[test]
fn drain_is_capped_per_call() {
    let dir = tempfile::tempdir().unwrap();
    let watcher = DirWatcher::new(dir.path()).unwrap();
    for i in 0..(MAX_EVENTS_PER_DRAIN + 3) {
        std::fs::write(dir.path().join(format!("f{i}.fits")), b"x").unwrap();
    }

    let queue = Queue::new();
    let mut before = 0;
    wait_for(|| {
        before = queue.len();
        watcher.drain_into(&queue);
        assert!(queue.len() - before <= MAX_EVENTS_PER_DRAIN);
        queue.len() == MAX_EVENTS_PER_DRAIN + 3
    });
    assert_eq!(queue.len(), MAX_EVENTS_PER_DRAIN + 3);
}

#[test]
fn watching_a_missing_folder_fails() {
    let err = DirWatcher::new(Path::new("/nonexistent/ql-watch"));
    assert!(err.is_err());
}
