//! Redis-backed snapshot cache and pub/sub notification channel.
//!
//! Writes use `SET`, which Redis acknowledges only after the value is
//! visible to every other client. The consumer awaits that acknowledgement
//! before issuing `PUBLISH`, so a subscriber that reacts to a notification
//! always reads the value it announces (or a newer one).
//!
//! Subscriptions need a connection of their own: a connection in
//! subscribe mode cannot run regular commands.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use crate::adapters::redis_client;
use crate::domain::scores::Notification;
use crate::ports::{
    ChannelError, NotificationPublisher, NotificationStream, NotificationSubscriber,
    SnapshotStore, StoreError,
};

/// Snapshot cache and notification publisher over one reconnecting connection.
#[derive(Clone)]
pub struct RedisSnapshotStore {
    conn: ConnectionManager,
}

impl RedisSnapshotStore {
    /// Connect to the store at `url`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let conn = redis_client::connect(url, timeout)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl SnapshotStore for RedisSnapshotStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();

        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e: RedisError| StoreError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();

        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e: RedisError| StoreError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl NotificationPublisher for RedisSnapshotStore {
    async fn notify(
        &self,
        channel: &str,
        notification: &Notification,
    ) -> Result<usize, ChannelError> {
        let mut conn = self.conn.clone();

        let receivers: i64 = conn
            .publish(channel, notification.to_payload())
            .await
            .map_err(|e: RedisError| ChannelError::Publish {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        Ok(receivers.max(0) as usize)
    }
}

impl std::fmt::Debug for RedisSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSnapshotStore").finish_non_exhaustive()
    }
}

/// Opens pub/sub subscriptions, one dedicated connection each.
pub struct RedisNotificationSubscriber {
    client: Client,
    timeout: Duration,
}

impl RedisNotificationSubscriber {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ChannelError> {
        let client = Client::open(url).map_err(|e| ChannelError::Connection(e.to_string()))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl NotificationSubscriber for RedisNotificationSubscriber {
    async fn subscribe(&self, channel: &str) -> Result<NotificationStream, ChannelError> {
        let subscribe_error = |reason: String| ChannelError::Subscribe {
            channel: channel.to_string(),
            reason,
        };

        let mut pubsub = tokio::time::timeout(self.timeout, self.client.get_async_connection())
            .await
            .map_err(|_| subscribe_error("timed out connecting".to_string()))?
            .map_err(|e| subscribe_error(e.to_string()))?
            .into_pubsub();

        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable notification payload");
                    return None;
                }
            };
            match Notification::parse(&payload) {
                Ok(notification) => Some(notification),
                Err(e) => {
                    tracing::warn!(payload = %payload, error = %e, "Dropping malformed notification");
                    None
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

impl std::fmt::Debug for RedisNotificationSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisNotificationSubscriber")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_rejects_malformed_url() {
        let result = RedisNotificationSubscriber::new("not-a-redis-url", Duration::from_secs(1));
        assert!(matches!(result, Err(ChannelError::Connection(_))));
    }

    #[tokio::test]
    async fn subscribe_to_unreachable_server_fails() {
        let subscriber =
            RedisNotificationSubscriber::new("redis://127.0.0.1:1", Duration::from_secs(1)).unwrap();

        let result = subscriber.subscribe("match-updates").await;

        assert!(matches!(
            result,
            Err(ChannelError::Subscribe { ref channel, .. }) if channel == "match-updates"
        ));
    }
}
