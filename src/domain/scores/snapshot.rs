//! Snapshot - the authoritative state of one match at a point in time.

use serde_json::{Map, Value};

use crate::domain::foundation::{MatchId, SnapshotError};

/// Full state of one match as published by the upstream provider.
///
/// The serialized form is canonical: object keys are sorted at every depth
/// and the encoding is compact. Two records that differ only in key order or
/// whitespace produce the same serialized form, which is what change
/// detection compares and what the cache stores.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    match_id: MatchId,
    payload: Value,
    serialized: String,
}

impl Snapshot {
    /// Builds a snapshot from a decoded upstream record.
    ///
    /// # Errors
    ///
    /// - `NotAnObject` if the record is not a JSON object
    /// - `MissingId` if the record has no `id` field
    /// - `InvalidId` if the `id` is neither a string nor an integer
    pub fn from_value(payload: Value) -> Result<Self, SnapshotError> {
        let object = payload.as_object().ok_or(SnapshotError::NotAnObject)?;
        let id = object.get("id").ok_or(SnapshotError::MissingId)?;
        let match_id = MatchId::from_json(id)?;

        let payload = canonicalize(payload);
        let serialized = serde_json::to_string(&payload)
            .map_err(|e| SnapshotError::InvalidJson(e.to_string()))?;

        Ok(Self {
            match_id,
            payload,
            serialized,
        })
    }

    /// Parses a snapshot from its wire form (a bus message payload).
    pub fn parse(raw: &str) -> Result<Self, SnapshotError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| SnapshotError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Returns the match this snapshot describes.
    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    /// Returns the decoded record.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the canonical serialized form.
    pub fn serialized(&self) -> &str {
        &self.serialized
    }
}

/// Rebuilds every object with its keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
