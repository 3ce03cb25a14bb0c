//! HTTP implementation of the `UpstreamSource` port.
//!
//! Performs a plain `GET` against the configured endpoint and decodes the
//! body as JSON. Non-success statuses are reported as errors rather than
//! decoded, so an error page never becomes a snapshot.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::ports::{UpstreamError, UpstreamSource};

/// Reads the match record from an HTTP endpoint.
pub struct HttpUpstreamSource {
    url: String,
    client: Client,
}

impl HttpUpstreamSource {
    /// Creates a source for `url` with a per-request `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Unreachable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UpstreamSource for HttpUpstreamSource {
    async fn fetch(&self) -> Result<Value, UpstreamError> {
        tracing::debug!(url = %self.url, "Fetching upstream record");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::InvalidBody(e.to_string()))
    }
}

impl std::fmt::Debug for HttpUpstreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpstreamSource")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}
