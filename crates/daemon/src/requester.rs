// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outgoing HTTP client for cross-node traffic.

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors from cross-node requests.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("cannot read {0}: {1}")]
    File(String, #[source] std::io::Error),
}

/// Thin client around the node endpoints.
pub struct Requester {
    client: reqwest::Client,
    server_url: String,
}

impl Default for Requester {
    fn default() -> Self {
        Self::new()
    }
}

impl Requester {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new(), server_url: String::new() }
    }

    /// Point subsequent requests at `http://addr:port`.
    pub fn set_server_url(&mut self, url: impl Into<String>) {
        self.server_url = url.into();
    }

    /// GET a route and return the body text.
    pub async fn request_data(&self, route: &str) -> Result<String, RequestError> {
        let url = format!("{}{}", self.server_url, route);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status { url, status: status.as_u16() });
        }
        Ok(response.text().await?)
    }

    /// POST a file to `<route>/<basename>` as an octet stream.
    pub async fn post_file(&self, route: &str, file: &Path) -> Result<(), RequestError> {
        let basename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let body = tokio::fs::read(file)
            .await
            .map_err(|e| RequestError::File(file.display().to_string(), e))?;
        let url = format!("{}{}/{}", self.server_url, route, basename);
        debug!(%url, size = body.len(), "POST file");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status { url, status: status.as_u16() });
        }
        Ok(())
    }
}
