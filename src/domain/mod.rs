//! Domain layer containing the pipeline's value types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `scores` - Snapshots, the publisher's change record and notifications

pub mod foundation;
pub mod scores;
