//! Notification channel and cache key configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Names shared by the consumer (writer) and the broadcaster (reader)
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Pub/sub channel carrying match ids
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Prefix of the snapshot keys in the shared store
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel.trim().is_empty() {
            return Err(ValidationError::MissingRequired("NOTIFICATIONS_CHANNEL"));
        }
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_channel() -> String {
    "match-updates".to_string()
}

fn default_key_prefix() -> String {
    "match:".to_string()
}
