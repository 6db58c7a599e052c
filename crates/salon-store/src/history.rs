//! Per-user message history.
//!
//! An append-only ordered log with targeted removal and filtered replay.
//! Every user owns exactly one [`History`]; insertion order is send/arrival
//! order and is never re-sorted.

use std::sync::Arc;

use tracing::debug;

use salon_shared::{Message, Username};

use crate::cursor::SearchCursor;

/// Ordered log of the messages one user has sent or received.
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<Arc<Message>>,
    last_sent: Option<String>,
}

impl History {
    /// Create a new, empty history.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            last_sent: None,
        }
    }

    /// Append a message at the end of the log.
    ///
    /// No deduplication and no size bound: the same message appended twice
    /// is stored twice.
    pub fn append(&mut self, message: Arc<Message>) {
        self.messages.push(message);
    }

    /// Remove the earliest message authored by `sender`, if any.
    ///
    /// First-match-only: the scan starts at the oldest entry and stops after
    /// a single removal, so later messages from the same sender survive.
    /// Undo retracts one message, it does not purge a user.
    pub fn remove_first_from(&mut self, sender: &Username) -> Option<Arc<Message>> {
        let index = self.messages.iter().position(|m| m.is_from(sender))?;
        let removed = self.messages.remove(index);
        debug!(sender = %sender, id = %removed.id(), "removed message from history");
        Some(removed)
    }

    /// The ordered message sequence for display.
    ///
    /// With a filter user, only messages *authored by* that user are kept
    /// (sender-only; the search cursor uses the broader sender-or-recipient
    /// predicate instead).
    pub fn replay(&self, filter: Option<&Username>) -> Vec<Arc<Message>> {
        match filter {
            Some(user) => self
                .messages
                .iter()
                .filter(|m| m.is_from(user))
                .cloned()
                .collect(),
            None => self.messages.clone(),
        }
    }

    /// Record the content of the owning user's most recent send.
    ///
    /// Independent of the append log and of the undo snapshot; undoing a
    /// message does not clear this.
    pub fn set_last_sent(&mut self, content: impl Into<String>) {
        self.last_sent = Some(content.into());
    }

    /// Content of the most recent send, if the owner ever sent anything.
    pub fn last_sent(&self) -> Option<&str> {
        self.last_sent.as_deref()
    }

    /// A forward-only cursor over the messages that involve `target` as
    /// sender or recipient, bound to the sequence as it is right now.
    pub fn search(&self, target: &Username) -> SearchCursor {
        SearchCursor::new(self.messages.clone(), target.clone())
    }

    /// The raw message sequence, oldest first.
    pub fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    /// Number of messages currently in the log.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
