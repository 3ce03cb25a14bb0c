//! LiveScore Nexus - Live score distribution pipeline
//!
//! Moves match snapshots from one upstream HTTP source to many websocket
//! viewers in three independently deployable stages:
//!
//! - `poller` publishes a snapshot to the message bus whenever it changes
//! - `consumer` caches each snapshot and announces it on a pub/sub channel
//! - `broadcaster` re-reads announced snapshots and pushes them to viewers

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod shutdown;
pub mod telemetry;
