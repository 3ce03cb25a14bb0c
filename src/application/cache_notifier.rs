//! CacheNotifier - Moves snapshots from the bus into the shared store.
//!
//! For every bus message the snapshot is written to the store first, and
//! only once that write is acknowledged is the match id announced on the
//! notification channel. A reader woken by the notification is therefore
//! guaranteed to find the data.
//!
//! ## Acknowledgement
//!
//! | Outcome | Acked | Notes |
//! |---------|-------|-------|
//! | `Notified` | yes | |
//! | `NotifyFailed` | yes | data is cached, viewers just miss this push |
//! | `Malformed` | yes | redelivery would fail the same way |
//! | `StoreFailed` | no | retried, then fatal; the bus redelivers on restart |

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::{NotificationConfig, RetryConfig};
use crate::domain::scores::{store_key, Notification, Snapshot};
use crate::ports::{BusConsumer, BusMessage, NotificationPublisher, SnapshotStore};

use super::PipelineError;

/// What processing one message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Written and announced.
    Notified,
    /// Written, but the announcement failed.
    NotifyFailed,
    /// Dropped: no payload, bad JSON, or no usable id.
    Malformed,
    /// Store write failed; nothing was announced.
    StoreFailed,
}

impl ProcessOutcome {
    /// Whether the message is done with and may be acknowledged.
    pub fn should_ack(&self) -> bool {
        !matches!(self, ProcessOutcome::StoreFailed)
    }
}

/// Background service consuming the bus into the store.
pub struct CacheNotifier {
    consumer: Arc<dyn BusConsumer>,
    store: Arc<dyn SnapshotStore>,
    publisher: Arc<dyn NotificationPublisher>,
    notifications: NotificationConfig,
    retry: RetryConfig,
}

impl CacheNotifier {
    pub fn new(
        consumer: Arc<dyn BusConsumer>,
        store: Arc<dyn SnapshotStore>,
        publisher: Arc<dyn NotificationPublisher>,
        notifications: NotificationConfig,
    ) -> Self {
        Self {
            consumer,
            store,
            publisher,
            notifications,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy for bus and store failures.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Consume until shutdown is signalled or the infrastructure is gone.
    ///
    /// Messages are handled one at a time in delivery order. A batch that
    /// has been received is always finished before shutdown takes effect.
    ///
    /// # Errors
    ///
    /// Returns an error once the bus or the store has failed
    /// `retry.max_attempts` times in a row.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), PipelineError> {
        let mut poll_failures = 0;

        tracing::info!(channel = %self.notifications.channel, "Cache notifier started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                polled = self.consumer.poll() => polled,
            };

            let batch = match polled {
                Ok(batch) => {
                    poll_failures = 0;
                    batch
                }
                Err(e) => {
                    poll_failures += 1;
                    if poll_failures >= self.retry.max_attempts {
                        tracing::error!(attempts = poll_failures, error = %e, "Giving up on message bus");
                        return Err(PipelineError::BusUnavailable {
                            attempts: poll_failures,
                            reason: e.to_string(),
                        });
                    }
                    tracing::warn!(attempts = poll_failures, error = %e, "Bus poll failed, retrying");
                    tokio::time::sleep(self.retry.delay()).await;
                    continue;
                }
            };

            for message in &batch {
                self.deliver(message).await?;
            }
        }

        tracing::info!("Cache notifier stopped");
        Ok(())
    }

    /// Write one message's snapshot to the store, then announce it.
    ///
    /// Safe to call again for the same message: the write overwrites with
    /// the same value and the announcement is repeated.
    pub async fn process(&self, message: &BusMessage) -> ProcessOutcome {
        let Some(payload) = message.payload.as_deref() else {
            tracing::warn!(message_id = %message.id, "Message has no payload field, dropping");
            return ProcessOutcome::Malformed;
        };

        let snapshot = match Snapshot::parse(payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(message_id = %message.id, error = %e, "Malformed snapshot, dropping");
                return ProcessOutcome::Malformed;
            }
        };

        let match_id = snapshot.match_id();
        let key = store_key(&self.notifications.key_prefix, match_id);

        if let Err(e) = self.store.put(&key, snapshot.serialized()).await {
            tracing::error!(
                message_id = %message.id,
                match_id = %match_id,
                error = %e,
                "Store write failed, notification suppressed"
            );
            return ProcessOutcome::StoreFailed;
        }

        let notification = Notification::new(match_id.clone());
        match self
            .publisher
            .notify(&self.notifications.channel, &notification)
            .await
        {
            Ok(receivers) => {
                tracing::debug!(match_id = %match_id, receivers, "Snapshot cached and announced");
                ProcessOutcome::Notified
            }
            Err(e) => {
                tracing::warn!(match_id = %match_id, error = %e, "Snapshot cached but notification failed");
                ProcessOutcome::NotifyFailed
            }
        }
    }

    /// Process a message until it can be acknowledged.
    async fn deliver(&self, message: &BusMessage) -> Result<(), PipelineError> {
        let mut attempts = 0;

        loop {
            if self.process(message).await.should_ack() {
                if let Err(e) = self.consumer.ack(message).await {
                    tracing::warn!(message_id = %message.id, error = %e, "Ack failed, message will be redelivered");
                }
                return Ok(());
            }

            attempts += 1;
            if attempts >= self.retry.max_attempts {
                tracing::error!(message_id = %message.id, attempts, "Giving up on snapshot store");
                return Err(PipelineError::StoreUnavailable {
                    attempts,
                    message_id: message.id.clone(),
                });
            }
            tokio::time::sleep(self.retry.delay()).await;
        }
    }
}
