//! Receipt and undo notifications.
//!
//! The core emits a human-readable event whenever a user receives a message
//! or undoes one. The sink is pluggable so embedders can route the lines
//! wherever they like; tests capture them in memory.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::error;

use salon_shared::Username;

/// One observable event on the notification channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Notification {
    /// A message reached a recipient's history.
    MessageReceived {
        recipient: Username,
        sender: Username,
        content: String,
    },
    /// A user undid their most recent message.
    MessageUndone { user: Username, content: String },
    /// An undo was requested with no message left to undo.
    NothingToUndo { user: Username },
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::MessageReceived {
                recipient,
                sender,
                content,
            } => {
                write!(f, "[{recipient}] Received message from {sender}: {content}")
            }
            Notification::MessageUndone { user, content } => {
                write!(f, "[{user}] Undid last message: {content}")
            }
            Notification::NothingToUndo { user } => {
                write!(f, "[{user}] No messages to undo")
            }
        }
    }
}

/// Sink for notification events.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Notification);
}

/// Prints each notification line to stdout. The default sink for new users,
/// standing in for the client UIs a real deployment would push to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, event: &Notification) {
        println!("{event}");
    }
}

/// Collects notifications in memory, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event notified so far.
    pub fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, event: &Notification) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(e) => error!(error = %e, "Failed to record notification"),
        }
    }
}
