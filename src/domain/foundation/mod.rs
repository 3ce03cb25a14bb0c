//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and error types that form the
//! vocabulary of the score distribution pipeline.

mod errors;
mod ids;
mod timestamp;

pub use errors::{SnapshotError, ValidationError};
pub use ids::{MatchId, ViewerId};
pub use timestamp::Timestamp;
