//! Shared Redis connection setup.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{Client, ErrorKind, RedisError, RedisResult};

/// Opens a reconnecting connection to `url`.
///
/// `ConnectionManager` re-establishes the underlying connection on its own
/// after a drop; commands issued while it is down fail and are retried by
/// the caller's loop.
pub async fn connect(url: &str, timeout: Duration) -> RedisResult<ConnectionManager> {
    let client = Client::open(url)?;
    match tokio::time::timeout(timeout, ConnectionManager::new(client)).await {
        Ok(result) => result,
        Err(_) => Err(RedisError::from((
            ErrorKind::IoError,
            "Timed out connecting to Redis",
        ))),
    }
}
