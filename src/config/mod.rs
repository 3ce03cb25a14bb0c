//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `LIVESCORE` prefix and nested values use double underscores as separators.
//!
//! Each binary loads only the sections it needs:
//!
//! | Binary | Root | Sections |
//! |--------|------|----------|
//! | `poller` | [`PollerConfig`] | `upstream`, `bus`, `logging` |
//! | `consumer` | [`ConsumerConfig`] | `bus`, `redis`, `notifications`, `logging` |
//! | `broadcaster` | [`BroadcasterConfig`] | `server`, `redis`, `notifications`, `logging` |
//!
//! # Example
//!
//! ```no_run
//! use livescore_nexus::config::PollerConfig;
//!
//! let config = PollerConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Polling {} every {:?}", config.upstream.url, config.upstream.poll_interval());
//! ```

mod bus;
mod error;
mod logging;
mod notifications;
mod redis;
mod retry;
mod server;
mod upstream;

pub use bus::BusConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use notifications::NotificationConfig;
pub use redis::RedisConfig;
pub use retry::RetryConfig;
pub use server::ServerConfig;
pub use upstream::UpstreamConfig;

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "LIVESCORE";

/// Load a configuration root from environment variables
///
/// This function:
/// 1. Loads `.env` file if present (for development)
/// 2. Reads environment variables with `LIVESCORE` prefix
/// 3. Uses `__` (double underscore) to separate nested values
/// 4. Deserializes into typed configuration structs
///
/// # Environment Variable Format
///
/// - `LIVESCORE__UPSTREAM__POLL_INTERVAL_MS=5000` -> `upstream.poll_interval_ms = 5000`
/// - `LIVESCORE__BUS__RETRY__MAX_ATTEMPTS=10` -> `bus.retry.max_attempts = 10`
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Required environment variables are missing
/// - Values cannot be parsed into expected types
fn load_from_env<T: DeserializeOwned>() -> Result<T, ConfigError> {
    // Load .env file if present (development)
    dotenvy::dotenv().ok();

    let config = config::Config::builder()
        .add_source(
            config::Environment::default()
                .prefix(ENV_PREFIX)
                .separator("__"),
        )
        .build()?
        .try_deserialize()?;

    Ok(config)
}

/// Configuration of the change-detecting poller
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Upstream provider (required)
    pub upstream: UpstreamConfig,

    /// Message bus the snapshots are published to (required)
    pub bus: BusConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PollerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        load_from_env()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.upstream.validate()?;
        self.bus.validate()?;
        Ok(())
    }
}

/// Configuration of the cache-and-notify consumer
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    /// Message bus the snapshots are read from (required)
    pub bus: BusConfig,

    /// Shared store written to (required)
    pub redis: RedisConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConsumerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        load_from_env()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.bus.validate()?;
        self.redis.validate()?;
        self.notifications.validate()?;
        Ok(())
    }
}

/// Configuration of the websocket broadcast server
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcasterConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Shared store read from and subscribed to (required)
    pub redis: RedisConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BroadcasterConfig {
    pub fn load() -> Result<Self, ConfigError> {
        load_from_env()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.redis.validate()?;
        self.notifications.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "LIVESCORE__UPSTREAM__URL",
        "LIVESCORE__UPSTREAM__POLL_INTERVAL_MS",
        "LIVESCORE__BUS__URL",
        "LIVESCORE__BUS__TOPIC",
        "LIVESCORE__BUS__RETRY__MAX_ATTEMPTS",
        "LIVESCORE__REDIS__URL",
        "LIVESCORE__SERVER__PORT",
        "LIVESCORE__NOTIFICATIONS__CHANNEL",
    ];

    /// Helper to clear environment variables after testing
    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn set_poller_env() {
        env::set_var("LIVESCORE__UPSTREAM__URL", "https://scores.example.com/todos/1");
        env::set_var("LIVESCORE__UPSTREAM__POLL_INTERVAL_MS", "2500");
        env::set_var("LIVESCORE__BUS__URL", "redis://localhost:6379");
    }

    #[test]
    fn test_poller_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_poller_env();
        let result = PollerConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.upstream.url, "https://scores.example.com/todos/1");
        assert_eq!(config.upstream.poll_interval_ms, 2500);
        assert_eq!(config.bus.topic, "sports-data");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poller_missing_interval_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_poller_env();
        env::remove_var("LIVESCORE__UPSTREAM__POLL_INTERVAL_MS");
        let result = PollerConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn test_consumer_requires_redis_section() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LIVESCORE__BUS__URL", "redis://localhost:6379");
        let result = ConsumerConfig::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_consumer_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LIVESCORE__BUS__URL", "redis://bus:6379");
        env::set_var("LIVESCORE__BUS__TOPIC", "cup-final");
        env::set_var("LIVESCORE__BUS__RETRY__MAX_ATTEMPTS", "9");
        env::set_var("LIVESCORE__REDIS__URL", "redis://cache:6379");
        let result = ConsumerConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.bus.topic, "cup-final");
        assert_eq!(config.bus.retry.max_attempts, 9);
        assert_eq!(config.notifications.channel, "match-updates");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_broadcaster_defaults_and_custom_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LIVESCORE__REDIS__URL", "redis://localhost:6379");
        env::set_var("LIVESCORE__SERVER__PORT", "9090");
        let result = BroadcasterConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.notifications.key_prefix, "match:");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_broadcaster_rejects_invalid_redis_url() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LIVESCORE__REDIS__URL", "http://localhost:6379");
        let result = BroadcasterConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.validate(), Err(ValidationError::InvalidRedisUrl));
    }
}
