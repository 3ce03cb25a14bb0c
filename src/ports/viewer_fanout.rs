//! ViewerFanout port - Delivery of a snapshot to every connected viewer.

use async_trait::async_trait;

/// Port for pushing one payload to all live viewer connections.
///
/// Implementations must not let one slow or broken viewer hold up the
/// others.
#[async_trait]
pub trait ViewerFanout: Send + Sync {
    /// Queue `payload` for every viewer. Returns how many viewers got it.
    async fn broadcast(&self, payload: &str) -> usize;
}
