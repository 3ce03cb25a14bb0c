//! Message bus configuration

use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use super::error::ValidationError;
use super::redis::is_redis_url;
use super::retry::RetryConfig;

/// Message bus (Redis Streams) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Bus connection URL
    pub url: String,

    /// Stream the poller appends snapshots to
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Consumer group shared by all consumer instances
    #[serde(default = "default_group_id")]
    pub group_id: String,

    /// Name of this consumer within the group
    ///
    /// Should be stable across restarts so unacknowledged messages are
    /// picked up again by the restarted instance.
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// Maximum messages fetched per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// How long a poll blocks waiting for messages, in milliseconds
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,

    /// Create a missing consumer group at the start of the stream instead of its tail
    #[serde(default = "default_start_from_beginning")]
    pub start_from_beginning: bool,

    /// Reconnect policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl BusConfig {
    /// Get block timeout as Duration
    pub fn block(&self) -> Duration {
        Duration::from_millis(self.block_ms)
    }

    /// Validate bus configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("BUS_URL"));
        }
        if !is_redis_url(&self.url) {
            return Err(ValidationError::InvalidBusUrl);
        }
        if self.topic.trim().is_empty() {
            return Err(ValidationError::MissingRequired("BUS_TOPIC"));
        }
        if self.group_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("BUS_GROUP_ID"));
        }
        if self.consumer_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("BUS_CONSUMER_NAME"));
        }
        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ValidationError::InvalidBatchSize);
        }
        self.retry.validate()
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            topic: default_topic(),
            group_id: default_group_id(),
            consumer_name: default_consumer_name(),
            batch_size: default_batch_size(),
            block_ms: default_block_ms(),
            start_from_beginning: default_start_from_beginning(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_topic() -> String {
    "sports-data".to_string()
}

fn default_group_id() -> String {
    "sports-data-group".to_string()
}

fn default_consumer_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| format!("consumer-{}", Uuid::new_v4()))
}

fn default_batch_size() -> usize {
    16
}

fn default_block_ms() -> u64 {
    1000
}

fn default_start_from_beginning() -> bool {
    true
}
