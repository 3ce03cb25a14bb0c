//! UpstreamSource port - Interface for reading the live score provider.

use async_trait::async_trait;
use serde_json::Value;

/// Errors that can occur while fetching the upstream record.
///
/// All of them are transient from the poller's point of view: the tick is
/// skipped and the next one tries again.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Upstream body is not valid JSON: {0}")]
    InvalidBody(String),
}

/// Port for fetching the current state of the tracked match.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Fetch the current upstream record.
    async fn fetch(&self) -> Result<Value, UpstreamError>;
}
