// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("TskAgent_01_{i:02}")).collect()
}

#[test]
fn new_aggregate_starts_empty() {
    let info = AgentsInfo::new(&names(3));
    assert_eq!(info.agent_names.len(), 3);
    assert_eq!(info.agent_num_tasks, vec![0, 0, 0]);
    assert!(info.agents["TskAgent_01_01"].task_id.is_empty());
    assert_eq!(info.agents["TskAgent_01_01"].cont_status, None);
}

#[test]
fn least_loaded_prefers_lowest_index_on_tie() {
    let mut info = AgentsInfo::new(&names(3));
    assert_eq!(info.least_loaded(), Some(0));
    info.agent_num_tasks = vec![2, 1, 1];
    assert_eq!(info.least_loaded(), Some(1));
    info.agent_num_tasks = vec![2, 1, 0];
    assert_eq!(info.least_loaded(), Some(2));
}

#[test]
fn least_loaded_on_empty_pool_is_none() {
    let info = AgentsInfo::new(&[]);
    assert_eq!(info.least_loaded(), None);
}

#[test]
fn record_assignment_updates_both_views() {
    let mut info = AgentsInfo::new(&names(2));
    info.record_assignment(1, "TskAgent_01_02_20240101T000000-0001", 1);
    assert_eq!(info.agent_num_tasks, vec![0, 1]);
    let ag = &info.agents["TskAgent_01_02"];
    assert_eq!(ag.num_tasks, 1);
    assert_eq!(ag.task_id, "TskAgent_01_02_20240101T000000-0001");
}

#[test]
fn record_container_tracks_latest_status() {
    let mut info = AgentsInfo::new(&names(1));
    info.record_container("TskAgent_01_01", "abc123", TaskStatus::Running);
    let ag = &info.agents["TskAgent_01_01"];
    assert_eq!(ag.cont_id, "abc123");
    assert_eq!(ag.cont_status, Some(TaskStatus::Running));
}

#[test]
fn record_spectrum_replaces_counts() {
    let mut info = AgentsInfo::new(&names(1));
    let update = SpectrumUpdate {
        agent: "TskAgent_01_01".into(),
        counts: [("FINISHED".to_string(), 2u32)].into_iter().collect(),
    };
    info.record_spectrum(&update);
    assert_eq!(info.agents["TskAgent_01_01"].spectrum["FINISHED"], 2);
}

#[test]
fn spectrum_update_formats_as_pairs() {
    let update = SpectrumUpdate {
        agent: "a".into(),
        counts: [("FINISHED".to_string(), 2u32), ("RUNNING".to_string(), 1u32)]
            .into_iter()
            .collect(),
    };
    assert_eq!(update.format_counts(), "FINISHED:2 RUNNING:1");
}

#[test]
fn aggregate_serializes_with_machine_section() {
    let mut info = AgentsInfo::new(&names(1));
    info.machine = MachineInfo { load: [0.5, 0.4, 0.3], uname: "Linux 6.1".into() };
    let v = serde_json::to_value(&info).unwrap();
    assert_eq!(v["machine"]["load"][0], 0.5);
    assert_eq!(v["machine"]["uname"], "Linux 6.1");
    assert!(v["agents"]["TskAgent_01_01"].is_object());
}
