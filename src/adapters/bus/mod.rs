//! Message bus adapters.
//!
//! - `RedisStreamPublisher` / `RedisStreamConsumer` - Redis Streams with
//!   consumer groups (production)
//! - `InMemoryBus` - In-process bus for testing

mod in_memory;
mod redis_stream;

pub use in_memory::InMemoryBus;
pub use redis_stream::{RedisStreamConsumer, RedisStreamPublisher};
