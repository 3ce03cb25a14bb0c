//! ChangeDetector - Polls upstream and publishes only what changed.
//!
//! Each tick:
//! 1. Fetch the upstream record
//! 2. Build its canonical snapshot
//! 3. Compare against the last published snapshot
//! 4. Publish to the bus when different, then remember it
//!
//! ## Graceful Shutdown
//!
//! `run` stops starting new ticks once shutdown is signalled. A tick that
//! is already running completes first.
//!
//! ## Bus Loss
//!
//! `run` gives up after `retry.max_attempts` consecutive failed publishes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::{self, MissedTickBehavior};

use crate::config::RetryConfig;
use crate::domain::scores::{ChangeRecord, Snapshot};
use crate::ports::{BusPublisher, UpstreamSource};

use super::PipelineError;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Snapshot differed and the bus accepted it.
    Published,
    /// Snapshot identical to the last published one.
    Unchanged,
    /// Upstream unreachable or returned an unusable record.
    FetchFailed,
    /// Bus rejected the snapshot; the change record was left alone.
    PublishFailed,
    /// Another tick was still running.
    InFlight,
}

/// Background service turning upstream polls into bus messages.
pub struct ChangeDetector {
    source: Arc<dyn UpstreamSource>,
    publisher: Arc<dyn BusPublisher>,
    topic: String,
    poll_interval: Duration,
    retry: RetryConfig,

    /// Held for the whole tick, which makes ticks single-flight.
    record: Mutex<ChangeRecord>,
}

impl ChangeDetector {
    pub fn new(
        source: Arc<dyn UpstreamSource>,
        publisher: Arc<dyn BusPublisher>,
        topic: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            publisher,
            topic: topic.into(),
            poll_interval,
            retry: RetryConfig::default(),
            record: Mutex::new(ChangeRecord::new()),
        }
    }

    /// Override how many consecutive publish failures `run` tolerates.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Run ticks on the poll interval until shutdown is signalled.
    ///
    /// The first tick fires immediately. Ticks missed while a slow one was
    /// running are skipped rather than bunched up.
    ///
    /// # Errors
    ///
    /// Returns an error once `retry.max_attempts` publishes in a row have
    /// failed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), PipelineError> {
        let mut publish_failures = 0;
        let mut interval = time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            topic = %self.topic,
            interval_ms = self.poll_interval.as_millis() as u64,
            "Change detector started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = interval.tick() => {
                    match self.tick().await {
                        TickOutcome::Published => publish_failures = 0,
                        TickOutcome::PublishFailed => {
                            publish_failures += 1;
                            if publish_failures >= self.retry.max_attempts {
                                tracing::error!(
                                    topic = %self.topic,
                                    attempts = publish_failures,
                                    "Giving up on message bus"
                                );
                                return Err(PipelineError::BusUnavailable {
                                    attempts: publish_failures,
                                    reason: "publish rejected".to_string(),
                                });
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        tracing::info!("Change detector stopped");
        Ok(())
    }

    /// Run one fetch-compare-publish cycle.
    ///
    /// Returns [`TickOutcome::InFlight`] without doing anything when a
    /// previous tick has not finished yet.
    pub async fn tick(&self) -> TickOutcome {
        let Ok(mut record) = self.record.try_lock() else {
            tracing::debug!("Previous tick still in flight, skipping");
            return TickOutcome::InFlight;
        };

        self.tick_with(&mut record).await
    }

    /// Copy of the retained change record.
    ///
    /// Waits for an in-flight tick to finish.
    pub async fn last_published(&self) -> ChangeRecord {
        self.record.lock().await.clone()
    }

    async fn tick_with(&self, record: &mut ChangeRecord) -> TickOutcome {
        let body = match self.source.fetch().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Upstream fetch failed, skipping tick");
                return TickOutcome::FetchFailed;
            }
        };

        let snapshot = match Snapshot::from_value(body) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Upstream returned an unusable record, skipping tick");
                return TickOutcome::FetchFailed;
            }
        };

        if !record.has_changed(&snapshot) {
            tracing::debug!(match_id = %snapshot.match_id(), "No change since last publish");
            return TickOutcome::Unchanged;
        }

        match self
            .publisher
            .publish(
                &self.topic,
                snapshot.match_id().as_str(),
                snapshot.serialized(),
            )
            .await
        {
            Ok(message_id) => {
                record.record(&snapshot);
                tracing::info!(
                    match_id = %snapshot.match_id(),
                    topic = %self.topic,
                    message_id = %message_id,
                    "Published changed snapshot"
                );
                TickOutcome::Published
            }
            Err(e) => {
                tracing::warn!(
                    match_id = %snapshot.match_id(),
                    topic = %self.topic,
                    error = %e,
                    "Publish failed, will retry on next change check"
                );
                TickOutcome::PublishFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryBus;
    use crate::ports::UpstreamError;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    /// Returns scripted responses in order, then fails.
    struct ScriptedSource {
        responses: std::sync::Mutex<VecDeque<Result<Value, UpstreamError>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Value, UpstreamError>>) -> Self {
            Self {
                responses: std::sync::Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl UpstreamSource for ScriptedSource {
        async fn fetch(&self) -> Result<Value, UpstreamError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(UpstreamError::Unreachable("script exhausted".into())))
        }
    }

    /// Blocks every fetch until released.
    struct GatedSource {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl UpstreamSource for GatedSource {
        async fn fetch(&self) -> Result<Value, UpstreamError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(json!({"id": 1, "title": "A"}))
        }
    }

    fn detector(source: Arc<dyn UpstreamSource>, bus: Arc<InMemoryBus>) -> ChangeDetector {
        ChangeDetector::new(source, bus, "sports-data", Duration::from_millis(10))
    }

    #[tokio::test]
    async fn first_tick_publishes() {
        let bus = Arc::new(InMemoryBus::default());
        let source = Arc::new(ScriptedSource::new(vec![Ok(
            json!({"id": 1, "title": "A", "completed": false}),
        )]));
        let detector = detector(source, bus.clone());

        assert_eq!(detector.tick().await, TickOutcome::Published);

        let published = bus.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].key.as_deref(), Some("1"));
        assert_eq!(
            published[0].payload.as_deref(),
            Some(r#"{"completed":false,"id":1,"title":"A"}"#)
        );
    }

    #[tokio::test]
    async fn identical_fetch_is_skipped() {
        let bus = Arc::new(InMemoryBus::default());
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(json!({"id": 1, "title": "A"})),
            Ok(json!({"title": "A", "id": 1})),
        ]));
        let detector = detector(source, bus.clone());

        assert_eq!(detector.tick().await, TickOutcome::Published);
        assert_eq!(detector.tick().await, TickOutcome::Unchanged);
        assert_eq!(bus.published_count(), 1);
    }

    #[tokio::test]
    async fn changed_fetch_is_published() {
        let bus = Arc::new(InMemoryBus::default());
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(json!({"id": 1, "title": "A"})),
            Ok(json!({"id": 1, "title": "B"})),
        ]));
        let detector = detector(source, bus.clone());

        detector.tick().await;
        assert_eq!(detector.tick().await, TickOutcome::Published);
        assert_eq!(bus.published_count(), 2);
        assert_eq!(
            detector.last_published().await.last_serialized(),
            Some(r#"{"id":1,"title":"B"}"#)
        );
    }

    #[tokio::test]
    async fn fetch_failure_skips_tick() {
        let bus = Arc::new(InMemoryBus::default());
        let source = Arc::new(ScriptedSource::new(vec![Err(UpstreamError::Status(503))]));
        let detector = detector(source, bus.clone());

        assert_eq!(detector.tick().await, TickOutcome::FetchFailed);
        assert_eq!(bus.published_count(), 0);
        assert!(detector.last_published().await.is_empty());
    }

    #[tokio::test]
    async fn record_without_id_is_treated_as_fetch_failure() {
        let bus = Arc::new(InMemoryBus::default());
        let source = Arc::new(ScriptedSource::new(vec![Ok(json!({"title": "A"}))]));
        let detector = detector(source, bus.clone());

        assert_eq!(detector.tick().await, TickOutcome::FetchFailed);
        assert_eq!(bus.published_count(), 0);
    }

    #[tokio::test]
    async fn publish_failure_does_not_advance_record() {
        let bus = Arc::new(InMemoryBus::default());
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(json!({"id": 1, "title": "A"})),
            Ok(json!({"id": 1, "title": "A"})),
        ]));
        let detector = detector(source, bus.clone());

        bus.set_fail_publish(true);
        assert_eq!(detector.tick().await, TickOutcome::PublishFailed);
        assert!(detector.last_published().await.is_empty());

        // Same data again: still counts as a change because nothing went out.
        bus.set_fail_publish(false);
        assert_eq!(detector.tick().await, TickOutcome::Published);
        assert_eq!(bus.published_count(), 1);
    }

    #[tokio::test]
    async fn overlapping_tick_is_skipped() {
        let bus = Arc::new(InMemoryBus::default());
        let source = Arc::new(GatedSource {
            started: Notify::new(),
            release: Notify::new(),
        });
        let detector = Arc::new(detector(source.clone(), bus.clone()));

        let first = tokio::spawn({
            let detector = detector.clone();
            async move { detector.tick().await }
        });
        source.started.notified().await;

        assert_eq!(detector.tick().await, TickOutcome::InFlight);

        source.release.notify_one();
        assert_eq!(first.await.unwrap(), TickOutcome::Published);
        assert_eq!(bus.published_count(), 1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let bus = Arc::new(InMemoryBus::default());
        let source = Arc::new(ScriptedSource::new(vec![Ok(json!({"id": 1}))]));
        let detector = Arc::new(detector(source, bus.clone()));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let detector = detector.clone();
            async move { detector.run(rx).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("run did not stop")
            .unwrap();

        assert!(result.is_ok());
        assert_eq!(bus.published_count(), 1);
    }

    #[tokio::test]
    async fn run_gives_up_when_bus_keeps_rejecting() {
        let bus = Arc::new(InMemoryBus::default());
        let source = Arc::new(ScriptedSource::new(
            (0..20).map(|_| Ok(json!({"id": 1, "title": "A"}))).collect(),
        ));
        let detector = ChangeDetector::new(source, bus.clone(), "sports-data", Duration::from_millis(2))
            .with_retry(RetryConfig {
                max_attempts: 3,
                delay_ms: 1,
            });
        bus.set_fail_publish(true);
        let (_tx, rx) = watch::channel(false);

        let result = tokio::time::timeout(Duration::from_millis(500), detector.run(rx))
            .await
            .expect("run did not give up");

        assert!(matches!(
            result,
            Err(PipelineError::BusUnavailable { attempts: 3, .. })
        ));
        assert!(detector.last_published().await.is_empty());
    }

    #[tokio::test]
    async fn fetch_failures_do_not_count_against_the_bus() {
        let bus = Arc::new(InMemoryBus::default());
        let mut responses: Vec<Result<Value, UpstreamError>> = vec![
            Err(UpstreamError::Status(503)),
            Err(UpstreamError::Status(503)),
            Err(UpstreamError::Status(503)),
        ];
        responses.push(Ok(json!({"id": 1})));
        let detector = Arc::new(
            ChangeDetector::new(
                Arc::new(ScriptedSource::new(responses)),
                bus.clone(),
                "sports-data",
                Duration::from_millis(2),
            )
            .with_retry(RetryConfig {
                max_attempts: 2,
                delay_ms: 1,
            }),
        );
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let detector = detector.clone();
            async move { detector.run(rx).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        assert!(handle.await.unwrap().is_ok());
        assert_eq!(bus.published_count(), 1);
    }

    proptest! {
        #[test]
        fn publishes_once_per_change(scores in proptest::collection::vec(0u8..3, 1..20)) {
            let expected = 1 + scores.windows(2).filter(|w| w[0] != w[1]).count();
            let responses = scores
                .iter()
                .map(|s| Ok(json!({"id": 7, "score": s})))
                .collect();

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let published = runtime.block_on(async {
                let bus = Arc::new(InMemoryBus::default());
                let detector = detector(Arc::new(ScriptedSource::new(responses)), bus.clone());
                for _ in 0..scores.len() {
                    detector.tick().await;
                }
                bus.published_count()
            });

            prop_assert_eq!(published, expected);
        }
    }
}
