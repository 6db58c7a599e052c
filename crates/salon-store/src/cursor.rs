//! Forward-only search cursor over a history's message sequence.

use std::sync::Arc;

use salon_shared::{Message, Username};

use crate::error::{Result, StoreError};

/// Walks the messages that involve one user as sender or recipient.
///
/// The cursor binds to a snapshot of the history taken at construction (the
/// `Arc`s are cloned, not the messages), so later history mutations are not
/// reflected. Forward-only and not restartable: once exhausted it stays
/// exhausted.
#[derive(Debug)]
pub struct SearchCursor {
    messages: Vec<Arc<Message>>,
    target: Username,
    position: usize,
}

impl SearchCursor {
    pub(crate) fn new(messages: Vec<Arc<Message>>, target: Username) -> Self {
        Self {
            messages,
            target,
            position: 0,
        }
    }

    /// The user this cursor searches for.
    pub fn target(&self) -> &Username {
        &self.target
    }

    /// Advance past non-matching messages; `true` iff a qualifying message
    /// remains.
    ///
    /// Idempotent once positioned on a match: repeated calls without an
    /// intervening [`next`](Self::next) stay put.
    pub fn has_next(&mut self) -> bool {
        while self.position < self.messages.len() {
            if self.messages[self.position].involves(&self.target) {
                return true;
            }
            self.position += 1;
        }
        false
    }

    /// Return the next message involving the target and step past it.
    ///
    /// Fails with [`StoreError::CursorExhausted`] when no qualifying message
    /// remains; callers check [`has_next`](Self::has_next) first.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Arc<Message>> {
        if !self.has_next() {
            return Err(StoreError::CursorExhausted(self.target.clone()));
        }
        let message = Arc::clone(&self.messages[self.position]);
        self.position += 1;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: &str, recipients: &[&str], content: &str) -> Arc<Message> {
        Arc::new(Message::new(
            Username::from(sender),
            recipients.iter().map(|r| Username::from(*r)).collect(),
            content,
        ))
    }

    fn cursor_over(messages: Vec<Arc<Message>>, target: &str) -> SearchCursor {
        SearchCursor::new(messages, Username::from(target))
    }

    #[test]
    fn test_cursor_yields_sender_or_recipient_matches_in_order() {
        let messages = vec![
            msg("alice", &["bob"], "to bob"),
            msg("charlie", &["alice"], "not for bob"),
            msg("bob", &["charlie"], "from bob"),
            msg("charlie", &["dave", "bob"], "bob among others"),
        ];
        let mut cursor = cursor_over(messages, "bob");

        let mut seen = Vec::new();
        while cursor.has_next() {
            seen.push(cursor.next().unwrap().content().to_string());
        }
        assert_eq!(seen, ["to bob", "from bob", "bob among others"]);
    }

    #[test]
    fn test_has_next_is_idempotent_on_a_match() {
        let messages = vec![
            msg("charlie", &["dave"], "skip me"),
            msg("alice", &["bob"], "match"),
        ];
        let mut cursor = cursor_over(messages, "bob");

        assert!(cursor.has_next());
        assert!(cursor.has_next());
        assert!(cursor.has_next());
        assert_eq!(cursor.next().unwrap().content(), "match");
    }

    #[test]
    fn test_next_after_exhaustion_fails() {
        let messages = vec![msg("alice", &["bob"], "only")];
        let mut cursor = cursor_over(messages, "bob");

        assert!(cursor.has_next());
        cursor.next().unwrap();
        assert!(!cursor.has_next());

        let err = cursor.next().unwrap_err();
        assert!(matches!(err, StoreError::CursorExhausted(_)));
    }

    #[test]
    fn test_next_without_has_next_still_skips_non_matches() {
        let messages = vec![
            msg("charlie", &["dave"], "skip"),
            msg("bob", &["alice"], "hit"),
        ];
        let mut cursor = cursor_over(messages, "bob");

        // next() performs the same advance has_next() would.
        assert_eq!(cursor.next().unwrap().content(), "hit");
    }

    #[test]
    fn test_empty_sequence_is_exhausted_immediately() {
        let mut cursor = cursor_over(Vec::new(), "bob");
        assert!(!cursor.has_next());
        assert!(cursor.next().is_err());
    }
}
