//! Broadcaster - Turns change notifications into viewer pushes.
//!
//! On every notification the broadcaster re-reads the snapshot from the
//! store and hands it, byte for byte, to every connected viewer. The
//! notification itself never carries data.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;

use crate::config::{NotificationConfig, RetryConfig};
use crate::domain::scores::{store_key, Notification};
use crate::ports::{NotificationSubscriber, SnapshotStore, ViewerFanout};

use super::PipelineError;

/// What handling one notification did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Snapshot queued for this many viewers.
    Delivered(usize),
    /// Nothing stored under the match id; skipped.
    Missing,
    /// Store read failed; skipped.
    StoreFailed,
}

/// Background service fanning snapshots out to viewers.
pub struct Broadcaster {
    store: Arc<dyn SnapshotStore>,
    viewers: Arc<dyn ViewerFanout>,
    notifications: NotificationConfig,
    retry: RetryConfig,
}

impl Broadcaster {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        viewers: Arc<dyn ViewerFanout>,
        notifications: NotificationConfig,
    ) -> Self {
        Self {
            store,
            viewers,
            notifications,
            retry: RetryConfig::default(),
        }
    }

    /// Override the resubscribe policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Follow the notification channel until shutdown.
    ///
    /// A dropped subscription is re-established after the retry delay.
    /// Notifications published while unsubscribed are lost.
    ///
    /// # Errors
    ///
    /// Returns an error after `retry.max_attempts` consecutive failed
    /// subscribe attempts.
    pub async fn run(
        &self,
        subscriber: Arc<dyn NotificationSubscriber>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), PipelineError> {
        let channel = self.notifications.channel.as_str();
        let mut failures = 0;

        'subscribe: loop {
            if *shutdown.borrow() {
                break;
            }

            let mut stream = match subscriber.subscribe(channel).await {
                Ok(stream) => {
                    failures = 0;
                    tracing::info!(channel = %channel, "Subscribed to notifications");
                    stream
                }
                Err(e) => {
                    failures += 1;
                    if failures >= self.retry.max_attempts {
                        tracing::error!(channel = %channel, attempts = failures, error = %e, "Giving up on notification channel");
                        return Err(PipelineError::SubscriptionLost {
                            attempts: failures,
                            reason: e.to_string(),
                        });
                    }
                    tracing::warn!(channel = %channel, attempts = failures, error = %e, "Subscribe failed, retrying");
                    if self.pause_or_shutdown(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break 'subscribe;
                        }
                    }

                    next = stream.next() => match next {
                        Some(notification) => {
                            self.handle_notification(&notification).await;
                        }
                        None => {
                            tracing::warn!(channel = %channel, "Subscription ended, resubscribing");
                            break;
                        }
                    }
                }
            }

            if self.pause_or_shutdown(&mut shutdown).await {
                break;
            }
        }

        tracing::info!("Broadcaster stopped");
        Ok(())
    }

    /// Push the current snapshot for the notified match to every viewer.
    pub async fn handle_notification(&self, notification: &Notification) -> BroadcastOutcome {
        let match_id = notification.match_id();
        let key = store_key(&self.notifications.key_prefix, match_id);

        let snapshot = match self.store.get(&key).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!(match_id = %match_id, "No snapshot stored, skipping");
                return BroadcastOutcome::Missing;
            }
            Err(e) => {
                tracing::warn!(match_id = %match_id, error = %e, "Store read failed, skipping");
                return BroadcastOutcome::StoreFailed;
            }
        };

        let delivered = self.viewers.broadcast(&snapshot).await;
        tracing::debug!(match_id = %match_id, viewers = delivered, "Snapshot broadcast");
        BroadcastOutcome::Delivered(delivered)
    }

    /// Wait out the retry delay. Returns true if shutdown came first.
    async fn pause_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.retry.delay()) => *shutdown.borrow(),
            changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySnapshotStore, ViewerRegistry};
    use crate::domain::foundation::MatchId;
    use crate::ports::NotificationPublisher;
    use std::time::Duration;

    const SNAPSHOT: &str = r#"{"id":1,"title":"A"}"#;

    fn notification(id: &str) -> Notification {
        Notification::new(MatchId::new(id).unwrap())
    }

    fn broadcaster(store: &Arc<InMemorySnapshotStore>, registry: &Arc<ViewerRegistry>) -> Broadcaster {
        Broadcaster::new(store.clone(), registry.clone(), NotificationConfig::default()).with_retry(
            RetryConfig {
                max_attempts: 3,
                delay_ms: 5,
            },
        )
    }

    #[tokio::test]
    async fn stored_snapshot_reaches_every_viewer() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let registry = Arc::new(ViewerRegistry::default());
        let mut receivers = Vec::new();
        for _ in 0..3 {
            receivers.push(registry.join().await.1);
        }
        store.seed("match:1", SNAPSHOT);

        let outcome = broadcaster(&store, &registry)
            .handle_notification(&notification("1"))
            .await;

        assert_eq!(outcome, BroadcastOutcome::Delivered(3));
        for rx in receivers.iter_mut() {
            assert_eq!(rx.recv().await.as_deref(), Some(SNAPSHOT));
        }
    }

    #[tokio::test]
    async fn missing_snapshot_is_skipped() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let registry = Arc::new(ViewerRegistry::default());
        let (_id, mut rx) = registry.join().await;

        let outcome = broadcaster(&store, &registry)
            .handle_notification(&notification("404"))
            .await;

        assert_eq!(outcome, BroadcastOutcome::Missing);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn evicted_snapshot_is_skipped() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let registry = Arc::new(ViewerRegistry::default());
        let (_id, mut rx) = registry.join().await;
        let broadcaster = broadcaster(&store, &registry);
        store.seed("match:1", SNAPSHOT);

        assert_eq!(
            broadcaster.handle_notification(&notification("1")).await,
            BroadcastOutcome::Delivered(1)
        );
        assert_eq!(rx.recv().await.as_deref(), Some(SNAPSHOT));

        store.evict("match:1");

        assert_eq!(
            broadcaster.handle_notification(&notification("1")).await,
            BroadcastOutcome::Missing
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.viewer_count().await, 1);
    }

    #[tokio::test]
    async fn store_read_failure_is_skipped() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let registry = Arc::new(ViewerRegistry::default());
        store.seed("match:1", SNAPSHOT);
        store.set_fail_reads(true);

        let outcome = broadcaster(&store, &registry)
            .handle_notification(&notification("1"))
            .await;

        assert_eq!(outcome, BroadcastOutcome::StoreFailed);
    }

    #[tokio::test]
    async fn broken_viewer_does_not_block_others() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let registry = Arc::new(ViewerRegistry::default());
        let (_a, mut rx_a) = registry.join().await;
        let (_b, rx_b) = registry.join().await;
        drop(rx_b);
        store.seed("match:1", SNAPSHOT);

        let outcome = broadcaster(&store, &registry)
            .handle_notification(&notification("1"))
            .await;

        assert_eq!(outcome, BroadcastOutcome::Delivered(1));
        assert_eq!(rx_a.recv().await.as_deref(), Some(SNAPSHOT));
        assert_eq!(registry.viewer_count().await, 1);
    }

    #[tokio::test]
    async fn run_delivers_notifications_and_resubscribes() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let registry = Arc::new(ViewerRegistry::default());
        let (_id, mut rx) = registry.join().await;
        let broadcaster = Arc::new(broadcaster(&store, &registry));
        let (tx, shutdown) = watch::channel(false);

        let handle = tokio::spawn({
            let broadcaster = broadcaster.clone();
            let subscriber = store.clone();
            async move { broadcaster.run(subscriber, shutdown).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.seed("match:1", SNAPSHOT);
        store.notify("match-updates", &notification("1")).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some(SNAPSHOT));

        // Connection drop: the broadcaster subscribes again and keeps going.
        store.drop_subscriptions();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.subscriber_count("match-updates"), 1);

        store.seed("match:1", r#"{"id":1,"title":"B"}"#);
        store.notify("match-updates", &notification("1")).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some(r#"{"id":1,"title":"B"}"#));

        tx.send(true).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn run_fails_after_repeated_subscribe_errors() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let registry = Arc::new(ViewerRegistry::default());
        store.fail_next_subscribes(10);
        let (_tx, shutdown) = watch::channel(false);

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            broadcaster(&store, &registry).run(store.clone(), shutdown),
        )
        .await
        .expect("run did not give up");

        assert!(matches!(
            result,
            Err(PipelineError::SubscriptionLost { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn transient_subscribe_errors_are_retried() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let registry = Arc::new(ViewerRegistry::default());
        store.fail_next_subscribes(2);
        let (tx, shutdown) = watch::channel(false);

        let handle = tokio::spawn({
            let broadcaster = broadcaster(&store, &registry);
            let subscriber = store.clone();
            async move { broadcaster.run(subscriber, shutdown).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.subscriber_count("match-updates"), 1);
        tx.send(true).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }
}
