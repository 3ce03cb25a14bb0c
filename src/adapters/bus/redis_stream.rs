//! Redis Streams implementation of the message bus ports.
//!
//! # Wire format
//!
//! Each snapshot becomes one stream entry:
//!
//! ```text
//! XADD sports-data * key <match id> payload <serialized snapshot>
//! ```
//!
//! Consumers read through a consumer group with `XREADGROUP` and confirm
//! with `XACK`. Entries delivered but never acknowledged stay in the group's
//! pending list; a consumer walks its own pending entries once (starting at
//! id `0`) before asking for new ones (id `>`), which gives at-least-once
//! delivery across restarts as long as the consumer name is stable.
//!
//! # Ordering
//!
//! A single stream is totally ordered. With several consumers in one group
//! entries are spread across them, so two updates of the same match can be
//! processed concurrently by different instances.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, RedisError};

use crate::adapters::redis_client;
use crate::config::BusConfig;
use crate::ports::{BusConsumer, BusError, BusMessage, BusPublisher};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const KEY_FIELD: &str = "key";
const PAYLOAD_FIELD: &str = "payload";

async fn connect(url: &str) -> Result<ConnectionManager, BusError> {
    redis_client::connect(url, CONNECT_TIMEOUT)
        .await
        .map_err(|e| BusError::Connection(e.to_string()))
}

/// Appends snapshots to a Redis stream.
#[derive(Clone)]
pub struct RedisStreamPublisher {
    conn: ConnectionManager,
}

impl RedisStreamPublisher {
    /// Connect to the bus at `url`.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        Ok(Self {
            conn: connect(url).await?,
        })
    }
}

#[async_trait]
impl BusPublisher for RedisStreamPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<String, BusError> {
        let mut conn = self.conn.clone();

        conn.xadd::<_, _, _, _, String>(topic, "*", &[(KEY_FIELD, key), (PAYLOAD_FIELD, payload)])
            .await
            .map_err(|e: RedisError| BusError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

impl std::fmt::Debug for RedisStreamPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamPublisher").finish_non_exhaustive()
    }
}

/// Reads snapshots from a Redis stream as one member of a consumer group.
pub struct RedisStreamConsumer {
    conn: ConnectionManager,
    topic: String,
    group: String,
    consumer: String,
    batch_size: usize,
    block_ms: usize,
    start_from_beginning: bool,
    position: Mutex<ReadPosition>,
}

/// Where the next `XREADGROUP` starts.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReadPosition {
    /// Walking this consumer's pending entries after the given id.
    Backlog(String),
    /// Reading entries never delivered to the group.
    Live,
}

impl RedisStreamConsumer {
    /// Connect and make sure the consumer group exists.
    pub async fn connect(config: &BusConfig) -> Result<Self, BusError> {
        let consumer = Self {
            conn: connect(&config.url).await?,
            topic: config.topic.clone(),
            group: config.group_id.clone(),
            consumer: config.consumer_name.clone(),
            batch_size: config.batch_size,
            block_ms: config.block_ms as usize,
            start_from_beginning: config.start_from_beginning,
            position: Mutex::new(ReadPosition::Backlog("0".to_string())),
        };
        consumer.ensure_group().await?;

        tracing::info!(
            topic = %consumer.topic,
            group = %consumer.group,
            consumer = %consumer.consumer,
            "Joined consumer group"
        );

        Ok(consumer)
    }

    /// Create the consumer group (and the stream) if missing.
    async fn ensure_group(&self) -> Result<(), BusError> {
        let start_id = if self.start_from_beginning { "0" } else { "$" };
        let mut conn = self.conn.clone();

        match conn
            .xgroup_create_mkstream::<_, _, _, ()>(&self.topic, &self.group, start_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(BusError::Connection(format!(
                "Failed to create consumer group '{}': {}",
                self.group, e
            ))),
        }
    }

    fn to_message(entry: StreamId) -> BusMessage {
        let key = entry.get::<String>(KEY_FIELD);
        let payload = entry.get::<String>(PAYLOAD_FIELD);
        BusMessage::new(entry.id, key, payload)
    }

    fn position(&self) -> ReadPosition {
        self.position
            .lock()
            .map(|p| p.clone())
            .unwrap_or(ReadPosition::Live)
    }

    fn set_position(&self, position: ReadPosition) {
        if let Ok(mut current) = self.position.lock() {
            *current = position;
        }
    }
}

#[async_trait]
impl BusConsumer for RedisStreamConsumer {
    async fn poll(&self) -> Result<Vec<BusMessage>, BusError> {
        let position = self.position();
        let start_id = match &position {
            ReadPosition::Backlog(after) => after.clone(),
            ReadPosition::Live => ">".to_string(),
        };

        let mut options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(self.batch_size);
        if position == ReadPosition::Live {
            options = options.block(self.block_ms);
        }

        let mut conn = self.conn.clone();
        let reply = match conn
            .xread_options::<_, _, Option<StreamReadReply>>(&[&self.topic], &[&start_id], &options)
            .await
        {
            Ok(reply) => reply,
            Err(e) if e.code() == Some("NOGROUP") => {
                // Stream or group was deleted underneath us.
                tracing::warn!(topic = %self.topic, group = %self.group, "Consumer group missing, recreating");
                self.ensure_group().await?;
                self.set_position(ReadPosition::Backlog("0".to_string()));
                return Ok(Vec::new());
            }
            Err(e) => return Err(BusError::Consume(e.to_string())),
        };

        let messages: Vec<BusMessage> = reply
            .map(|r| {
                r.keys
                    .into_iter()
                    .flat_map(|stream| stream.ids)
                    .map(Self::to_message)
                    .collect()
            })
            .unwrap_or_default();

        if let ReadPosition::Backlog(_) = position {
            match messages.last() {
                Some(last) => {
                    tracing::info!(count = messages.len(), "Re-reading unacknowledged messages");
                    self.set_position(ReadPosition::Backlog(last.id.clone()));
                }
                None => self.set_position(ReadPosition::Live),
            }
        }

        Ok(messages)
    }

    async fn ack(&self, message: &BusMessage) -> Result<(), BusError> {
        let mut conn = self.conn.clone();

        conn.xack::<_, _, _, i64>(&self.topic, &self.group, &[&message.id])
            .await
            .map_err(|e: RedisError| BusError::Ack {
                id: message.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(())
    }
}

impl std::fmt::Debug for RedisStreamConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamConsumer")
            .field("topic", &self.topic)
            .field("group", &self.group)
            .field("consumer", &self.consumer)
            .finish_non_exhaustive()
    }
}

