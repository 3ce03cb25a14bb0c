//! Notification channel ports - Fire-and-forget change signals.
//!
//! The channel has no persistence: subscribers that are not connected when a
//! notification is published never see it.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::domain::scores::Notification;

/// Errors that can occur on the notification channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel connection error: {0}")]
    Connection(String),

    #[error("Failed to publish on '{channel}': {reason}")]
    Publish { channel: String, reason: String },

    #[error("Failed to subscribe to '{channel}': {reason}")]
    Subscribe { channel: String, reason: String },
}

/// Stream of notifications from one subscription.
///
/// Ends when the underlying subscription connection is lost.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Notification> + Send>>;

/// Port for announcing that a snapshot was written.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Publish `notification` on `channel`.
    ///
    /// Returns the number of subscribers that received it.
    async fn notify(&self, channel: &str, notification: &Notification)
        -> Result<usize, ChannelError>;
}

/// Port for listening to change announcements.
#[async_trait]
pub trait NotificationSubscriber: Send + Sync {
    /// Open a new subscription to `channel`.
    async fn subscribe(&self, channel: &str) -> Result<NotificationStream, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_publisher_object_safe(_: &dyn NotificationPublisher) {}

    #[allow(dead_code)]
    fn assert_subscriber_object_safe(_: &dyn NotificationSubscriber) {}
}
