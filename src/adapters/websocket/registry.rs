//! Registry of live viewer connections.
//!
//! Every connected viewer owns a bounded outbound queue. Broadcasting walks
//! the registry and queues the payload for each viewer without waiting on
//! any socket; a per-connection task drains the queue into the socket.
//!
//! ```text
//! Broadcaster ──broadcast()──► ViewerRegistry
//!                               ├── viewer-a queue ──► socket task a
//!                               ├── viewer-b queue ──► socket task b
//!                               └── viewer-c queue ──► socket task c
//! ```
//!
//! A viewer whose queue is closed (socket task gone) or full (socket not
//! keeping up) is removed during the broadcast. Nothing else is affected.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

use crate::domain::foundation::ViewerId;
use crate::ports::ViewerFanout;

/// Frame shared by every viewer queue.
pub type Frame = Arc<str>;

/// Manages the set of connected viewers.
///
/// # Thread Safety
///
/// Uses `RwLock` for the registry since broadcasts (reads) vastly
/// outnumber joins/leaves (writes).
pub struct ViewerRegistry {
    viewers: RwLock<HashMap<ViewerId, mpsc::Sender<Frame>>>,

    /// Capacity of each viewer's outbound queue.
    buffer: usize,
}

impl ViewerRegistry {
    /// Create a registry whose viewers queue up to `buffer` frames.
    pub fn new(buffer: usize) -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Register a new viewer.
    ///
    /// Returns the viewer's id and the receiving end of its queue. The
    /// viewer only sees frames broadcast after this call.
    pub async fn join(&self) -> (ViewerId, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let viewer_id = ViewerId::new();

        self.viewers.write().await.insert(viewer_id, tx);

        (viewer_id, rx)
    }

    /// Remove a viewer. Unknown ids are ignored.
    pub async fn leave(&self, viewer_id: &ViewerId) {
        self.viewers.write().await.remove(viewer_id);
    }

    /// Queue `payload` for every connected viewer.
    ///
    /// Returns the number of viewers it was queued for. Viewers whose queue
    /// is closed or full are dropped from the registry.
    pub async fn broadcast(&self, payload: &str) -> usize {
        let frame: Frame = Arc::from(payload);
        let mut delivered = 0;
        let mut failed = Vec::new();

        {
            let viewers = self.viewers.read().await;
            for (viewer_id, tx) in viewers.iter() {
                match tx.try_send(frame.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(viewer_id = %viewer_id, "Viewer queue full, dropping slow viewer");
                        failed.push(*viewer_id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(viewer_id = %viewer_id, "Viewer connection gone");
                        failed.push(*viewer_id);
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut viewers = self.viewers.write().await;
            for viewer_id in &failed {
                viewers.remove(viewer_id);
            }
        }

        delivered
    }

    /// Number of connected viewers.
    pub async fn viewer_count(&self) -> usize {
        self.viewers.read().await.len()
    }

    /// Drop every viewer queue.
    ///
    /// Socket tasks finish sending whatever is already queued, then close.
    pub async fn close_all(&self) {
        let mut viewers = self.viewers.write().await;
        let count = viewers.len();
        viewers.clear();
        tracing::info!(viewers = count, "Closed all viewer queues");
    }
}

#[async_trait]
impl ViewerFanout for ViewerRegistry {
    async fn broadcast(&self, payload: &str) -> usize {
        ViewerRegistry::broadcast(self, payload).await
    }
}

impl Default for ViewerRegistry {
    fn default() -> Self {
        Self::new(64)
    }
}
