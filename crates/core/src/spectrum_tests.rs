// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn total(spec: &BTreeMap<&'static str, u32>) -> u32 {
    spec.values().sum()
}

#[test]
fn new_spectrum_is_all_zero() {
    let cs = ContainerSpectrum::new();
    let spec = cs.spectrum();
    assert_eq!(total(&spec), 0);
    assert_eq!(spec.len(), ALL_STATUSES.len());
}

#[test]
fn repeated_observations_of_one_container_count_once() {
    let mut cs = ContainerSpectrum::new();
    cs.append("c1", TaskStatus::Scheduled);
    cs.append("c1", TaskStatus::Running);
    cs.append("c1", TaskStatus::Running);
    cs.append("c1", TaskStatus::Finished);
    let spec = cs.spectrum();
    assert_eq!(spec["FINISHED"], 1);
    assert_eq!(spec["RUNNING"], 0);
    assert_eq!(total(&spec), 1);
}

#[test]
fn eviction_seals_the_oldest_status() {
    let mut cs = ContainerSpectrum::with_capacity(2);
    cs.append("c1", TaskStatus::Finished);
    cs.append("c2", TaskStatus::Failed);
    cs.append("c3", TaskStatus::Running);
    // c1 evicted into the saved histogram
    assert_eq!(cs.live_len(), 2);
    let spec = cs.spectrum();
    assert_eq!(spec["FINISHED"], 1);
    assert_eq!(spec["FAILED"], 1);
    assert_eq!(spec["RUNNING"], 1);
    assert_eq!(total(&spec), 3);
}

#[test]
fn totals_track_containers_ever_observed() {
    let mut cs = ContainerSpectrum::with_capacity(5);
    for i in 0..37 {
        cs.append(&format!("c{i}"), TaskStatus::Finished);
    }
    assert_eq!(cs.live_len(), 5);
    assert_eq!(total(&cs.spectrum()), 37);
}

#[test]
fn live_window_never_exceeds_capacity() {
    let mut cs = ContainerSpectrum::new();
    for i in 0..(SPECTRUM_WINDOW + 10) {
        cs.append(&format!("c{i}"), TaskStatus::Running);
    }
    assert_eq!(cs.live_len(), SPECTRUM_WINDOW);
    assert_eq!(total(&cs.spectrum()), (SPECTRUM_WINDOW + 10) as u32);
}
