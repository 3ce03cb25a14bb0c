//! Broadcaster - serves viewer websockets and pushes announced snapshots to them.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;

use livescore_nexus::adapters::{
    viewer_router, RedisNotificationSubscriber, RedisSnapshotStore, ViewerRegistry, ViewerState,
};
use livescore_nexus::application::Broadcaster;
use livescore_nexus::config::{BroadcasterConfig, ConfigError};
use livescore_nexus::{shutdown, telemetry};

fn load_config() -> Result<BroadcasterConfig, ConfigError> {
    let config = BroadcasterConfig::load()?;
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

    let store = match config
        .redis
        .retry
        .retry("connect to snapshot store", || {
            RedisSnapshotStore::connect(&config.redis.url, config.redis.timeout())
        })
        .await
    {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Snapshot store unavailable");
            return ExitCode::FAILURE;
        }
    };

    let subscriber = match RedisNotificationSubscriber::new(&config.redis.url, config.redis.timeout())
    {
        Ok(subscriber) => subscriber,
        Err(e) => {
            tracing::error!(error = %e, "Invalid notification channel settings");
            return ExitCode::FAILURE;
        }
    };

    let addr = match config.server.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "Invalid listen address");
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "Accepting viewers");

    // Stopped by a signal or by the broadcaster giving up.
    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);
    tokio::spawn({
        let stop_tx = stop_tx.clone();
        async move {
            shutdown::listen().await;
            let _ = stop_tx.send(true);
        }
    });

    let registry = Arc::new(ViewerRegistry::new(config.server.viewer_buffer));
    let broadcaster = Broadcaster::new(
        Arc::new(store),
        registry.clone(),
        config.notifications.clone(),
    )
    .with_retry(config.redis.retry.clone());

    let server = axum::serve(listener, viewer_router(ViewerState::new(registry.clone())))
        .with_graceful_shutdown({
            let stop_rx = stop_rx.clone();
            let registry = registry.clone();
            async move {
                shutdown::requested(stop_rx).await;
                registry.close_all().await;
            }
        });

    let fanout = async {
        let result = broadcaster.run(Arc::new(subscriber), stop_rx.clone()).await;
        if result.is_err() {
            let _ = stop_tx.send(true);
        }
        result
    };

    let (served, fanned_out) = tokio::join!(async { server.await }, fanout);

    let mut code = ExitCode::SUCCESS;
    if let Err(e) = served {
        tracing::error!(error = %e, "Viewer server failed");
        code = ExitCode::FAILURE;
    }
    if let Err(e) = fanned_out {
        tracing::error!(error = %e, "Broadcaster stopped on fatal error");
        code = ExitCode::FAILURE;
    }
    code
}
