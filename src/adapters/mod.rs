//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `upstream` - HTTP source of match snapshots
//! - `bus` - Message bus implementations (in-memory, Redis Streams)
//! - `cache` - Snapshot store and notification channel (in-memory, Redis)
//! - `websocket` - Viewer connections and the HTTP router serving them

pub mod bus;
pub mod cache;
pub mod redis_client;
pub mod upstream;
pub mod websocket;

pub use bus::{InMemoryBus, RedisStreamConsumer, RedisStreamPublisher};
pub use cache::{InMemorySnapshotStore, RedisNotificationSubscriber, RedisSnapshotStore, StoreOp};
pub use upstream::HttpUpstreamSource;
pub use websocket::{viewer_router, ViewerRegistry, ViewerState};
