use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MESSAGE_TIME_FORMAT;
use crate::types::{MessageId, Username};

/// An immutable record of one communication event.
///
/// Created exactly once per send and shared (behind an `Arc`) by the
/// sender's history and every recipient's history; no single history owns
/// or disposes it. Fields are private and never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    sender: Username,
    /// Recipient list exactly as the caller passed it, order preserved.
    /// The sender (or a blocked party) may appear here; delivery filtering
    /// happens at the server, not in the data model.
    recipients: Vec<Username>,
    content: String,
    sent_at: DateTime<Utc>,
}

impl Message {
    /// Build a message stamped with the current time.
    ///
    /// Callers are trusted: the recipient list may name the sender, and
    /// empty content is allowed.
    pub fn new(sender: Username, recipients: Vec<Username>, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            recipients,
            content: content.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn sender(&self) -> &Username {
        &self.sender
    }

    pub fn recipients(&self) -> &[Username] {
        &self.recipients
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    /// Sender-only predicate, used by history replay filtering and by
    /// undo removal.
    pub fn is_from(&self, user: &Username) -> bool {
        &self.sender == user
    }

    /// Sender-or-any-recipient predicate, used by the search cursor.
    pub fn involves(&self, user: &Username) -> bool {
        self.is_from(user) || self.recipients.iter().any(|r| r == user)
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] :{}",
            self.sent_at.format(MESSAGE_TIME_FORMAT),
            self.sender,
            self.content
        )
    }
}
