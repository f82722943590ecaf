// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-node HTTP endpoints.
//!
//! - `GET  /hello`            diagnostic greeting
//! - `GET  /status`           agent-info aggregate + machine section
//! - `GET  /tstatus`          last task frame per agent
//! - `POST /inbox/<name>`     upload bound for `data/inbox`
//! - `POST /outputs/<name>`   upload bound for `data/archive`
//!
//! Uploads land in the server staging area first and are then MOVEd
//! into their zone, so readers of the zone never see partial files.

use crate::locator::{self, LocateMethod};
use axum::extract::{DefaultBodyLimit, Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use ql_core::{AgentsInfo, TaskStatusEntry, WorkArea};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default request size cap (45 MB).
pub const DEFAULT_BODY_LIMIT: usize = 45_069_760;

/// Shared state behind the HTTP handlers.
#[derive(Clone)]
pub struct ServerState {
    pub node: String,
    pub info: Arc<Mutex<AgentsInfo>>,
    pub tstatus: Arc<Mutex<BTreeMap<String, TaskStatusEntry>>>,
    pub wa: WorkArea,
    pub body_limit: usize,
}

/// Build the node router.
pub fn router(state: ServerState) -> Router {
    let body_limit = state.body_limit;
    Router::new()
        .route("/hello", get(hello))
        .route("/status", get(status))
        .route("/tstatus", get(tstatus))
        .route("/inbox/:name", post(post_inbox))
        .route("/outputs/:name", post(post_outputs))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind and serve until the token is cancelled.
pub async fn serve(
    addr: SocketAddr,
    state: ServerState,
    quit: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, node = %state.node, "HTTP server started");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(quit.cancelled_owned())
        .await
}

async fn hello(State(state): State<ServerState>) -> String {
    format!("Hello from {}", state.node)
}

async fn status(State(state): State<ServerState>) -> Json<AgentsInfo> {
    Json(state.info.lock().clone())
}

async fn tstatus(
    State(state): State<ServerState>,
) -> Json<BTreeMap<String, TaskStatusEntry>> {
    Json(state.tstatus.lock().clone())
}

async fn post_inbox(
    State(state): State<ServerState>,
    UrlPath(name): UrlPath<String>,
    body: axum::body::Bytes,
) -> (StatusCode, &'static str) {
    receive(&state, &state.wa.remote_inbox, &state.wa.local_inbox, &name, &body)
}

async fn post_outputs(
    State(state): State<ServerState>,
    UrlPath(name): UrlPath<String>,
    body: axum::body::Bytes,
) -> (StatusCode, &'static str) {
    receive(&state, &state.wa.remote_outputs, &state.wa.archive, &name, &body)
}

fn receive(
    state: &ServerState,
    staging: &Path,
    target: &Path,
    name: &str,
    body: &[u8],
) -> (StatusCode, &'static str) {
    if !is_plain_basename(name) {
        return (StatusCode::BAD_REQUEST, "bad product name");
    }
    match receive_file(staging, target, name, body) {
        Ok(()) => {
            info!(node = %state.node, name, size = body.len(), "product received");
            (StatusCode::OK, "Done.")
        }
        Err(e) => {
            warn!(node = %state.node, name, "cannot receive product: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "cannot store product")
        }
    }
}

/// Uploaded names must be bare basenames.
pub(crate) fn is_plain_basename(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
}

/// Write the body into the staging folder, then MOVE it into the zone.
pub(crate) fn receive_file(
    staging: &Path,
    target: &Path,
    name: &str,
    body: &[u8],
) -> std::io::Result<()> {
    let staged = staging.join(name);
    std::fs::write(&staged, body)?;
    locator::relocate(&staged, &target.join(name), LocateMethod::Move)
        .map_err(std::io::Error::other)
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
