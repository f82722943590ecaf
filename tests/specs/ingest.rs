// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! From a file in the inbox to a populated task folder.

use ql_config::{Config, ProcessingNetwork};
use ql_core::{FileNameSpec, WorkArea};
use ql_daemon::containers::{ContainerRuntime, DockerCli};
use ql_daemon::locator::{self, LocateMethod};
use ql_daemon::manager::TaskManager;
use ql_daemon::orchestrator::TaskOrchestrator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const PROD: &str = "EUC_VIS_STACK-12345-120-M_20240101T000000.0Z_01.00.fits";

fn config() -> Config {
    serde_json::from_str(
        r#"{
        "general": { "masterHeartBeat": 1000 },
        "network": {
            "commander": "nodeA",
            "processingNodes": {
                "nodeA": { "address": "127.0.0.1", "port": 8080, "agents": 2 }
            }
        },
        "orchestration": {
            "rules": [
                { "name": "vis-stack", "inputs": "VIS_VIS", "processing": "qla-proc" }
            ],
            "processors": { "qla-proc": "QLA_Processor" }
        },
        "db": { "host": "h", "port": 5432, "name": "n", "user": "u", "pwd": "p" }
    }"#,
    )
    .unwrap()
}

#[tokio::test]
async fn inbox_product_becomes_a_scheduled_task() {
    let dir = tempfile::tempdir().unwrap();
    let wa = WorkArea::with_session_id(dir.path(), "20240101T000000").unwrap();
    let cfg = config();
    let net = ProcessingNetwork::new(&cfg, "nodeA").unwrap();
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::with_binary("/bin/false"));
    let quit = CancellationToken::new();
    let (manager, _agents) = TaskManager::new(&wa, &net, runtime, &quit).unwrap();
    let orchestrator = TaskOrchestrator::new(&cfg.orchestration);

    // Processor area with the default per-task config
    let proc_dir = wa.proc_area.join("QLA_Processor");
    std::fs::create_dir_all(&proc_dir).unwrap();
    std::fs::write(proc_dir.join("sample.cfg.json"), b"{}").unwrap();

    // Product arrives in the inbox
    let inbox_path = wa.local_inbox.join(PROD);
    std::fs::write(&inbox_path, b"fits-bytes").unwrap();

    // Parse, archive, schedule: the path every local product takes
    let mut meta = FileNameSpec::new().parse(&inbox_path).unwrap().meta;
    assert_eq!(meta.product_type, "VIS_VIS");
    locator::to_local_archive(&mut meta, &wa, LocateMethod::Link).unwrap();
    assert!(orchestrator.schedule(&mut meta, &manager));

    // Exactly one task folder, with the input linked and the processor
    // config staged
    let tasks: Vec<_> = std::fs::read_dir(&wa.tasks).unwrap().filter_map(Result::ok).collect();
    assert_eq!(tasks.len(), 1);
    let task_folder = tasks[0].path();
    let task_id = task_folder.file_name().unwrap().to_string_lossy().into_owned();
    assert!(task_id.starts_with("TskAgent_01_0"));
    assert!(task_folder.join("in").join(PROD).is_file());
    assert!(task_folder.join("QLA_Processor.cfg").is_file());

    // The product is archived and the agent aggregate shows the load
    assert!(wa.archive.join(PROD).is_file());
    let info = manager.info_handle();
    let info = info.lock();
    assert_eq!(info.agent_num_tasks.iter().sum::<u32>(), 1);
}

#[tokio::test]
async fn product_without_matching_rule_fires_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let wa = WorkArea::with_session_id(dir.path(), "20240101T000000").unwrap();
    let cfg = config();
    let net = ProcessingNetwork::new(&cfg, "nodeA").unwrap();
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::with_binary("/bin/false"));
    let quit = CancellationToken::new();
    let (manager, _agents) = TaskManager::new(&wa, &net, runtime, &quit).unwrap();
    let orchestrator = TaskOrchestrator::new(&cfg.orchestration);

    let path = wa.local_inbox.join("EUC_NIR_CAT-99999-30-W_20240101T000000.0Z_01.00.fits");
    std::fs::write(&path, b"x").unwrap();
    let mut meta = FileNameSpec::new().parse(&path).unwrap().meta;
    assert!(!orchestrator.schedule(&mut meta, &manager));
    assert!(std::fs::read_dir(&wa.tasks).unwrap().next().is_none());
}
