//! Notification - the "match changed, go re-read it" signal.

use crate::domain::foundation::{MatchId, ValidationError};

/// Change signal published after a snapshot has been written to the store.
///
/// Carries only the match id. Receivers must read the store to get the
/// snapshot, so a notification can never point at data other than what is
/// cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    match_id: MatchId,
}

impl Notification {
    pub fn new(match_id: MatchId) -> Self {
        Self { match_id }
    }

    /// Decodes a channel payload (the bare match id).
    pub fn parse(payload: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(MatchId::new(payload)?))
    }

    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    /// Encodes the notification for the pub/sub channel.
    pub fn to_payload(&self) -> String {
        self.match_id.to_string()
    }
}

/// Store key under which the snapshot for `match_id` lives.
pub fn store_key(prefix: &str, match_id: &MatchId) -> String {
    format!("{}{}", prefix, match_id)
}
