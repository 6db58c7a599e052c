//! Single-slot memento of a user's most recent send.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of the last message a user sent and has not yet undone.
///
/// Held per user as `Option<SentSnapshot>`: `None` means nothing to undo,
/// either because nothing was sent yet or because the last send was already
/// undone. Every send replaces the slot, so only one level of undo exists;
/// a second send before an undo permanently commits the first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SentSnapshot {
    /// Content of the last send.
    pub content: String,
    /// When it was sent (the message's own timestamp).
    pub sent_at: DateTime<Utc>,
}

impl SentSnapshot {
    pub fn new(content: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            sent_at,
        }
    }
}
