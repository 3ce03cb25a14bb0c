//! Errors that end a pipeline loop.

use thiserror::Error;

/// Fatal conditions. Everything else is logged and the loop carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Message bus unavailable after {attempts} attempts: {reason}")]
    BusUnavailable { attempts: u32, reason: String },

    #[error("Snapshot store unavailable after {attempts} attempts while processing message {message_id}")]
    StoreUnavailable { attempts: u32, message_id: String },

    #[error("Notification subscription lost after {attempts} attempts: {reason}")]
    SubscriptionLost { attempts: u32, reason: String },
}
