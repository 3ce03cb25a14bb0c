//! In-memory snapshot cache and notification channel for testing.
//!
//! Records every write and every publish in one ordered operation log, so
//! tests can assert that a notification was never issued before the write
//! it announces.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in production.
//! It uses `.expect()` on lock operations which will panic if locks are poisoned.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::domain::scores::Notification;
use crate::ports::{
    ChannelError, NotificationPublisher, NotificationStream, NotificationSubscriber,
    SnapshotStore, StoreError,
};

const CHANNEL_CAPACITY: usize = 256;

/// One observable effect on the store, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Put { key: String, value: String },
    Notify { channel: String, match_id: String },
}

/// In-memory store plus pub/sub channel.
pub struct InMemorySnapshotStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    values: HashMap<String, String>,
    channels: HashMap<String, broadcast::Sender<Notification>>,
    ops: Vec<StoreOp>,
    fail_writes: bool,
    fail_reads: bool,
    fail_notify: bool,
    failing_subscribes: u32,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .expect("InMemorySnapshotStore: state lock poisoned")
    }

    // === Test Helpers ===

    /// Reads a value without going through the port.
    pub fn value(&self, key: &str) -> Option<String> {
        self.state().values.get(key).cloned()
    }

    /// Writes a value directly, bypassing the operation log.
    pub fn seed(&self, key: &str, value: &str) {
        self.state()
            .values
            .insert(key.to_string(), value.to_string());
    }

    /// Removes a value, as an eviction would.
    pub fn evict(&self, key: &str) {
        self.state().values.remove(key);
    }

    /// Every write and publish so far, in order.
    pub fn ops(&self) -> Vec<StoreOp> {
        self.state().ops.clone()
    }

    /// Match ids notified on `channel`, in order.
    pub fn notifications(&self, channel: &str) -> Vec<String> {
        self.state()
            .ops
            .iter()
            .filter_map(|op| match op {
                StoreOp::Notify {
                    channel: c,
                    match_id,
                } if c == channel => Some(match_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    pub fn set_fail_notify(&self, fail: bool) {
        self.state().fail_notify = fail;
    }

    /// Makes the next `count` subscribe calls fail.
    pub fn fail_next_subscribes(&self, count: u32) {
        self.state().failing_subscribes = count;
    }

    /// Ends every open subscription, as a dropped pub/sub connection would.
    pub fn drop_subscriptions(&self) {
        self.state().channels.clear();
    }

    /// Number of live subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.state()
            .channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(StoreError::Write {
                key: key.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        state.values.insert(key.to_string(), value.to_string());
        state.ops.push(StoreOp::Put {
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let state = self.state();
        if state.fail_reads {
            return Err(StoreError::Read {
                key: key.to_string(),
                reason: "injected read failure".to_string(),
            });
        }
        Ok(state.values.get(key).cloned())
    }
}

#[async_trait]
impl NotificationPublisher for InMemorySnapshotStore {
    async fn notify(
        &self,
        channel: &str,
        notification: &Notification,
    ) -> Result<usize, ChannelError> {
        let mut state = self.state();
        if state.fail_notify {
            return Err(ChannelError::Publish {
                channel: channel.to_string(),
                reason: "injected publish failure".to_string(),
            });
        }
        state.ops.push(StoreOp::Notify {
            channel: channel.to_string(),
            match_id: notification.to_payload(),
        });

        // No subscribers is fine: the channel is fire-and-forget.
        let receivers = state
            .channels
            .get(channel)
            .and_then(|tx| tx.send(notification.clone()).ok())
            .unwrap_or(0);
        Ok(receivers)
    }
}

#[async_trait]
impl NotificationSubscriber for InMemorySnapshotStore {
    async fn subscribe(&self, channel: &str) -> Result<NotificationStream, ChannelError> {
        let rx = {
            let mut state = self.state();
            if state.failing_subscribes > 0 {
                state.failing_subscribes -= 1;
                return Err(ChannelError::Subscribe {
                    channel: channel.to_string(),
                    reason: "injected subscribe failure".to_string(),
                });
            }
            state
                .channels
                .entry(channel.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe()
        };

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => return Some((notification, rx)),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return None,
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
