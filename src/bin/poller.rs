//! Poller - publishes changed upstream snapshots to the message bus.

use std::process::ExitCode;
use std::sync::Arc;

use livescore_nexus::adapters::{HttpUpstreamSource, RedisStreamPublisher};
use livescore_nexus::application::ChangeDetector;
use livescore_nexus::config::{ConfigError, PollerConfig};
use livescore_nexus::{shutdown, telemetry};

fn load_config() -> Result<PollerConfig, ConfigError> {
    let config = PollerConfig::load()?;
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

    let source = match HttpUpstreamSource::new(
        config.upstream.url.clone(),
        config.upstream.request_timeout(),
    ) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build upstream client");
            return ExitCode::FAILURE;
        }
    };

    let publisher = match config
        .bus
        .retry
        .retry("connect to message bus", || {
            RedisStreamPublisher::connect(&config.bus.url)
        })
        .await
    {
        Ok(publisher) => publisher,
        Err(e) => {
            tracing::error!(error = %e, "Message bus unavailable");
            return ExitCode::FAILURE;
        }
    };

    let detector = ChangeDetector::new(
        Arc::new(source),
        Arc::new(publisher),
        config.bus.topic.clone(),
        config.upstream.poll_interval(),
    )
    .with_retry(config.bus.retry.clone());

    match detector.run(shutdown::on_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Poller stopped on fatal error");
            ExitCode::FAILURE
        }
    }
}
