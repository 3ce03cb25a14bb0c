//! ChangeRecord - the publisher's memory of what it last sent.

use crate::domain::foundation::{MatchId, Timestamp};

use super::Snapshot;

/// Last snapshot successfully handed to the message bus.
///
/// Lives only in memory. A restarted publisher starts empty and will publish
/// the current upstream state once even if it is unchanged.
#[derive(Debug, Clone, Default)]
pub struct ChangeRecord {
    last: Option<PublishedSnapshot>,
}

#[derive(Debug, Clone)]
struct PublishedSnapshot {
    match_id: MatchId,
    serialized: String,
    published_at: Timestamp,
}

impl ChangeRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `snapshot` differs from the last published one, or when
    /// nothing has been published yet.
    pub fn has_changed(&self, snapshot: &Snapshot) -> bool {
        match &self.last {
            Some(last) => last.serialized != snapshot.serialized(),
            None => true,
        }
    }

    /// Remembers `snapshot` as published. Call only after the bus accepted it.
    pub fn record(&mut self, snapshot: &Snapshot) {
        self.last = Some(PublishedSnapshot {
            match_id: snapshot.match_id().clone(),
            serialized: snapshot.serialized().to_string(),
            published_at: Timestamp::now(),
        });
    }

    /// Serialized form of the last published snapshot.
    pub fn last_serialized(&self) -> Option<&str> {
        self.last.as_ref().map(|l| l.serialized.as_str())
    }

    /// Match id of the last published snapshot.
    pub fn last_match_id(&self) -> Option<&MatchId> {
        self.last.as_ref().map(|l| &l.match_id)
    }

    /// When the last publish was accepted.
    pub fn published_at(&self) -> Option<Timestamp> {
        self.last.as_ref().map(|l| l.published_at)
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(completed: bool) -> Snapshot {
        Snapshot::from_value(json!({"id": 1, "title": "A", "completed": completed})).unwrap()
    }

    #[test]
    fn empty_record_reports_change() {
        let record = ChangeRecord::new();
        assert!(record.is_empty());
        assert!(record.has_changed(&snapshot(false)));
    }

    #[test]
    fn identical_snapshot_is_not_a_change() {
        let mut record = ChangeRecord::new();
        record.record(&snapshot(false));
        assert!(!record.has_changed(&snapshot(false)));
    }

    #[test]
    fn different_snapshot_is_a_change() {
        let mut record = ChangeRecord::new();
        record.record(&snapshot(false));
        assert!(record.has_changed(&snapshot(true)));
    }

    #[test]
    fn record_keeps_latest_only() {
        let mut record = ChangeRecord::new();
        record.record(&snapshot(false));
        record.record(&snapshot(true));

        assert_eq!(record.last_serialized(), Some(snapshot(true).serialized()));
        assert_eq!(record.last_match_id().map(|id| id.as_str()), Some("1"));
        assert!(record.published_at().is_some());
    }
}
