// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The node HTTP surface: hello, status, and product uploads.

use parking_lot::Mutex;
use ql_core::{AgentsInfo, MachineInfo, WorkArea};
use ql_daemon::requester::Requester;
use ql_daemon::server::{router, ServerState, DEFAULT_BODY_LIMIT};
use std::collections::BTreeMap;
use std::sync::Arc;

const PROD: &str = "EUC_VIS_STACK-12345-120-M_20240101T000000.0Z_01.00.fits";

struct Node {
    _dir: tempfile::TempDir,
    wa: WorkArea,
    url: String,
}

async fn spawn_node() -> Node {
    let dir = tempfile::tempdir().unwrap();
    let wa = WorkArea::with_session_id(dir.path(), "20240101T000000").unwrap();
    let mut info = AgentsInfo::new(&["TskAgent_01_01".to_string()]);
    info.machine = MachineInfo { load: [0.25, 0.2, 0.1], uname: "Linux test".into() };
    let state = ServerState {
        node: "nodeA".into(),
        info: Arc::new(Mutex::new(info)),
        tstatus: Arc::new(Mutex::new(BTreeMap::new())),
        wa: wa.clone(),
        body_limit: DEFAULT_BODY_LIMIT,
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    Node { _dir: dir, wa, url }
}

#[tokio::test]
async fn hello_answers_with_the_node_name() {
    let node = spawn_node().await;
    let mut client = Requester::new();
    client.set_server_url(node.url.clone());
    let body = client.request_data("/hello").await.unwrap();
    assert_eq!(body, "Hello from nodeA");
}

#[tokio::test]
async fn status_serves_the_agent_aggregate() {
    let node = spawn_node().await;
    let mut client = Requester::new();
    client.set_server_url(node.url.clone());
    let body = client.request_data("/status").await.unwrap();
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["machine"]["load"][0], 0.25);
    assert_eq!(v["machine"]["uname"], "Linux test");
    assert!(v["agents"]["TskAgent_01_01"].is_object());
}

#[tokio::test]
async fn inbox_upload_lands_in_the_data_inbox() {
    let node = spawn_node().await;
    let src_dir = tempfile::tempdir().unwrap();
    let src = src_dir.path().join(PROD);
    std::fs::write(&src, b"fits-payload").unwrap();

    let mut client = Requester::new();
    client.set_server_url(node.url.clone());
    client.post_file("/inbox", &src).await.unwrap();

    let landed = node.wa.local_inbox.join(PROD);
    assert!(landed.is_file());
    assert_eq!(std::fs::read(&landed).unwrap(), b"fits-payload");
    assert!(!node.wa.remote_inbox.join(PROD).exists(), "staging copy is gone");
}

#[tokio::test]
async fn outputs_upload_lands_in_the_archive() {
    let node = spawn_node().await;
    let src_dir = tempfile::tempdir().unwrap();
    let src = src_dir.path().join(PROD);
    std::fs::write(&src, b"archived").unwrap();

    let mut client = Requester::new();
    client.set_server_url(node.url.clone());
    client.post_file("/outputs", &src).await.unwrap();

    assert!(node.wa.archive.join(PROD).is_file());
}

#[tokio::test]
async fn post_to_a_dead_node_is_an_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let src_dir = tempfile::tempdir().unwrap();
    let src = src_dir.path().join(PROD);
    std::fs::write(&src, b"x").unwrap();

    let mut client = Requester::new();
    client.set_server_url(url);
    assert!(client.post_file("/inbox", &src).await.is_err());
    assert!(src.is_file(), "the local file survives a failed transfer");
}
