//! Consumer - caches bus snapshots and announces them on the notification channel.

use std::process::ExitCode;
use std::sync::Arc;

use livescore_nexus::adapters::{RedisSnapshotStore, RedisStreamConsumer};
use livescore_nexus::application::CacheNotifier;
use livescore_nexus::config::{ConfigError, ConsumerConfig};
use livescore_nexus::{shutdown, telemetry};

fn load_config() -> Result<ConsumerConfig, ConfigError> {
    let config = ConsumerConfig::load()?;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    telemetry::init(&config.logging);

    let consumer = match config
        .bus
        .retry
        .retry("connect to message bus", || RedisStreamConsumer::connect(&config.bus))
        .await
    {
        Ok(consumer) => consumer,
        Err(e) => {
            tracing::error!(error = %e, "Message bus unavailable");
            return ExitCode::FAILURE;
        }
    };

    let store = match config
        .redis
        .retry
        .retry("connect to snapshot store", || {
            RedisSnapshotStore::connect(&config.redis.url, config.redis.timeout())
        })
        .await
    {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "Snapshot store unavailable");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        topic = %config.bus.topic,
        group = %config.bus.group_id,
        consumer = %config.bus.consumer_name,
        "Consuming snapshots"
    );

    let notifier = CacheNotifier::new(
        Arc::new(consumer),
        store.clone(),
        store,
        config.notifications.clone(),
    )
    .with_retry(config.redis.retry.clone());

    match notifier.run(shutdown::on_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Consumer stopped on fatal error");
            ExitCode::FAILURE
        }
    }
}
