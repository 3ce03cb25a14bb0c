//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the pipeline and the infrastructure it runs on. Adapters implement these
//! ports.
//!
//! ## Ingest Ports
//!
//! - `UpstreamSource` - The HTTP score provider the poller reads
//! - `BusPublisher` / `BusConsumer` - Durable ordered hand-off to consumers
//!
//! ## Cache Ports
//!
//! - `SnapshotStore` - Shared key-value cache of the latest snapshots
//! - `NotificationPublisher` / `NotificationSubscriber` - Pub/sub change signals
//!
//! ## Delivery Ports
//!
//! - `ViewerFanout` - Push a snapshot to every connected viewer

mod message_bus;
mod notification_channel;
mod snapshot_store;
mod upstream_source;
mod viewer_fanout;

pub use message_bus::{BusConsumer, BusError, BusMessage, BusPublisher};
pub use notification_channel::{
    ChannelError, NotificationPublisher, NotificationStream, NotificationSubscriber,
};
pub use snapshot_store::{SnapshotStore, StoreError};
pub use upstream_source::{UpstreamError, UpstreamSource};
pub use viewer_fanout::ViewerFanout;
