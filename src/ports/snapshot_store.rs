//! SnapshotStore port - Shared key-value cache of the latest snapshots.

use async_trait::async_trait;

/// Errors that can occur reading or writing the shared store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Failed to write '{key}': {reason}")]
    Write { key: String, reason: String },

    #[error("Failed to read '{key}': {reason}")]
    Read { key: String, reason: String },
}

/// Port for the shared snapshot cache.
///
/// Plain get/set semantics with last-write-wins and no expiry.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Store `value` under `key`.
    ///
    /// Must only return `Ok` once the write is visible to every reader of
    /// the store. Callers rely on this before announcing the change.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Read the value under `key`, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn SnapshotStore) {}

    #[test]
    fn write_error_names_key() {
        let err = StoreError::Write {
            key: "match:1".to_string(),
            reason: "READONLY".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to write 'match:1': READONLY");
    }
}
