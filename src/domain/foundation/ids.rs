//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Identifier of a tracked match.
///
/// Upstream records carry the id either as a JSON integer or as a string;
/// both are normalized to their textual form so that `1` and `"1"` address
/// the same store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    /// Creates a MatchId from its textual form.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` if the id is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("id"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Extracts a MatchId from a JSON `id` value.
    ///
    /// Accepts strings and integers. Floats, booleans, null, arrays and
    /// objects are rejected.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        match value {
            Value::String(s) => Self::new(s.as_str()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::new(n.to_string()),
            Value::Number(_) => Err(ValidationError::invalid_format(
                "id",
                "numeric id must be an integer",
            )),
            other => Err(ValidationError::invalid_format(
                "id",
                format!("unsupported id type: {}", json_type_name(other)),
            )),
        }
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MatchId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Unique identifier for a live viewer connection.
///
/// Generated server-side when a viewer connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewerId(Uuid);

impl ViewerId {
    /// Creates a new random ViewerId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
