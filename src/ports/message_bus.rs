//! Message bus ports - Durable hand-off between the poller and consumers.
//!
//! The bus is external infrastructure with these guarantees:
//! - At-least-once delivery (consumers may see a message twice)
//! - Ordered delivery within one stream
//! - Consumer-group semantics: each group receives each message once

use async_trait::async_trait;

/// Errors that can occur talking to the message bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Bus connection error: {0}")]
    Connection(String),

    #[error("Failed to publish to '{topic}': {reason}")]
    Publish { topic: String, reason: String },

    #[error("Failed to consume: {0}")]
    Consume(String),

    #[error("Failed to acknowledge message {id}: {reason}")]
    Ack { id: String, reason: String },
}

/// One message as delivered to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Bus-assigned message id, used for acknowledgement.
    pub id: String,

    /// Partition key the producer attached (the match id).
    pub key: Option<String>,

    /// Serialized snapshot. `None` if the message carried no payload field.
    pub payload: Option<String>,
}

impl BusMessage {
    pub fn new(id: impl Into<String>, key: Option<String>, payload: Option<String>) -> Self {
        Self {
            id: id.into(),
            key,
            payload,
        }
    }
}

/// Producer side of the bus.
#[async_trait]
pub trait BusPublisher: Send + Sync {
    /// Append `payload` to `topic`, keyed by `key`.
    ///
    /// Returns the id the bus assigned once the append is acknowledged.
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<String, BusError>;
}

/// Consumer side of the bus, bound to one topic and one consumer group.
#[async_trait]
pub trait BusConsumer: Send + Sync {
    /// Wait for the next batch of messages, in delivery order.
    ///
    /// May return an empty batch when nothing arrived within the adapter's
    /// blocking window.
    async fn poll(&self) -> Result<Vec<BusMessage>, BusError>;

    /// Acknowledge a processed message so the group does not redeliver it.
    async fn ack(&self, message: &BusMessage) -> Result<(), BusError>;
}
