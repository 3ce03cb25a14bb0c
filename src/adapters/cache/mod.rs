//! Shared snapshot cache and notification channel adapters.
//!
//! - `RedisSnapshotStore` - GET/SET on the cache plus PUBLISH on the channel
//! - `RedisNotificationSubscriber` - SUBSCRIBE on a dedicated connection
//! - `InMemorySnapshotStore` - In-process store and channel for testing

mod in_memory;
mod redis;

pub use self::in_memory::{InMemorySnapshotStore, StoreOp};
pub use self::redis::{RedisNotificationSubscriber, RedisSnapshotStore};
