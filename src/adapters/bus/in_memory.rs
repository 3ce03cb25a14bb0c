//! In-memory message bus implementation for testing.
//!
//! Models one topic consumed by one consumer group: messages are delivered
//! in publish order, stay pending until acknowledged, and pending messages
//! can be handed out again to simulate a consumer restart.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in production.
//! It uses `.expect()` on lock operations which will panic if locks are poisoned.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::ports::{BusConsumer, BusError, BusMessage, BusPublisher};

/// In-memory bus for testing.
///
/// Features:
/// - Ordered delivery of everything published to its topic
/// - Pending/acknowledged bookkeeping for assertions
/// - Failure injection for publish and poll
pub struct InMemoryBus {
    topic: String,
    state: Mutex<BusState>,
    arrived: Notify,
    block: Duration,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    published: Vec<BusMessage>,
    undelivered: VecDeque<BusMessage>,
    pending: Vec<BusMessage>,
    acked: Vec<String>,
    fail_publish: bool,
    failing_polls: u32,
}

impl InMemoryBus {
    /// Creates an empty bus carrying `topic`.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            state: Mutex::new(BusState::default()),
            arrived: Notify::new(),
            block: Duration::from_millis(20),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, BusState> {
        self.state.lock().expect("InMemoryBus: state lock poisoned")
    }

    // === Test Helpers ===

    /// Injects a raw message as if some producer had written it.
    pub fn inject(&self, key: Option<&str>, payload: Option<&str>) -> String {
        let id = {
            let mut state = self.state();
            state.next_id += 1;
            let message = BusMessage::new(
                format!("{}-0", state.next_id),
                key.map(str::to_string),
                payload.map(str::to_string),
            );
            let id = message.id.clone();
            state.published.push(message.clone());
            state.undelivered.push_back(message);
            id
        };
        self.arrived.notify_one();
        id
    }

    /// Everything ever published to this bus, in order.
    pub fn published(&self) -> Vec<BusMessage> {
        self.state().published.clone()
    }

    /// Returns count of published messages.
    pub fn published_count(&self) -> usize {
        self.state().published.len()
    }

    /// Ids acknowledged by the consumer, in order.
    pub fn acked(&self) -> Vec<String> {
        self.state().acked.clone()
    }

    /// Messages delivered but not yet acknowledged.
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    /// Makes pending messages deliverable again, ahead of new ones.
    pub fn redeliver_pending(&self) {
        {
            let mut state = self.state();
            let pending = std::mem::take(&mut state.pending);
            for message in pending.into_iter().rev() {
                state.undelivered.push_front(message);
            }
        }
        self.arrived.notify_one();
    }

    /// Makes every subsequent publish fail until reset.
    pub fn set_fail_publish(&self, fail: bool) {
        self.state().fail_publish = fail;
    }

    /// Makes the next `count` polls fail.
    pub fn fail_next_polls(&self, count: u32) {
        self.state().failing_polls = count;
    }

    fn take_batch(&self) -> Result<Vec<BusMessage>, BusError> {
        let mut state = self.state();
        if state.failing_polls > 0 {
            state.failing_polls -= 1;
            return Err(BusError::Consume("injected poll failure".to_string()));
        }
        let batch: Vec<BusMessage> = state.undelivered.drain(..).collect();
        state.pending.extend(batch.iter().cloned());
        Ok(batch)
    }
}

#[async_trait]
impl BusPublisher for InMemoryBus {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<String, BusError> {
        if self.state().fail_publish {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                reason: "injected publish failure".to_string(),
            });
        }
        if topic != self.topic {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                reason: format!("unknown topic, bus carries '{}'", self.topic),
            });
        }
        Ok(self.inject(Some(key), Some(payload)))
    }
}

#[async_trait]
impl BusConsumer for InMemoryBus {
    async fn poll(&self) -> Result<Vec<BusMessage>, BusError> {
        let batch = self.take_batch()?;
        if !batch.is_empty() {
            return Ok(batch);
        }

        let _ = tokio::time::timeout(self.block, self.arrived.notified()).await;
        self.take_batch()
    }

    async fn ack(&self, message: &BusMessage) -> Result<(), BusError> {
        let mut state = self.state();
        state.pending.retain(|m| m.id != message.id);
        state.acked.push(message.id.clone());
        Ok(())
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new("sports-data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let bus = InMemoryBus::default();
        bus.publish("sports-data", "1", "a").await.unwrap();
        bus.publish("sports-data", "1", "b").await.unwrap();

        let batch = bus.poll().await.unwrap();
        let payloads: Vec<_> = batch.iter().map(|m| m.payload.clone().unwrap()).collect();
        assert_eq!(payloads, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn poll_on_empty_bus_returns_empty_batch() {
        let bus = InMemoryBus::default();
        assert!(bus.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unacked_messages_can_be_redelivered() {
        let bus = InMemoryBus::default();
        bus.publish("sports-data", "1", "a").await.unwrap();
        bus.publish("sports-data", "2", "b").await.unwrap();

        let batch = bus.poll().await.unwrap();
        bus.ack(&batch[0]).await.unwrap();
        assert_eq!(bus.pending_count(), 1);

        bus.redeliver_pending();
        let again = bus.poll().await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].payload.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn injected_publish_failure_stores_nothing() {
        let bus = InMemoryBus::default();
        bus.set_fail_publish(true);

        assert!(bus.publish("sports-data", "1", "a").await.is_err());
        assert_eq!(bus.published_count(), 0);
    }

    #[tokio::test]
    async fn publish_to_other_topic_is_rejected() {
        let bus = InMemoryBus::default();
        assert!(bus.publish("other", "1", "a").await.is_err());
    }
}
