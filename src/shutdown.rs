//! Process shutdown signalling.
//!
//! Every run loop takes a `watch::Receiver<bool>` that flips to `true`
//! once SIGINT or SIGTERM arrives.

use std::future::Future;

use tokio::sync::watch;

/// Resolve on Ctrl-C or SIGTERM.
pub async fn listen() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Spawn a task that flips the returned receiver once `signal` resolves.
pub fn watch_for<F>(signal: F) -> watch::Receiver<bool>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        signal.await;
        tracing::info!("Shutting down");
        let _ = tx.send(true);
    });
    rx
}

/// Shutdown receiver driven by process signals.
pub fn on_signal() -> watch::Receiver<bool> {
    watch_for(listen())
}

/// Resolve once `shutdown` has flipped to true or its sender is gone.
pub async fn requested(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
