//! Scores module - snapshots, the publisher's change record and the
//! notifications that announce a cached snapshot.

mod change_record;
mod notification;
mod snapshot;

pub use change_record::ChangeRecord;
pub use notification::{store_key, Notification};
pub use snapshot::Snapshot;
