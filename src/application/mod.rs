//! Application layer - The three pipeline stages.
//!
//! Each stage is a long-running service driven by a `run` loop that stops
//! on a shutdown signal, plus a single-step operation (`tick`, `process`,
//! `handle_notification`) that tests drive directly.
//!
//! ```text
//! upstream ──► ChangeDetector ──► bus ──► CacheNotifier ──► store + channel
//!                                                              │
//!                             viewers ◄── Broadcaster ◄────────┘
//! ```

mod broadcaster;
mod cache_notifier;
mod change_detector;
mod error;

pub use broadcaster::{BroadcastOutcome, Broadcaster};
pub use cache_notifier::{CacheNotifier, ProcessOutcome};
pub use change_detector::{ChangeDetector, TickOutcome};
pub use error::PipelineError;
