//! Chat participants.
//!
//! A [`User`] is a cheaply clonable handle: the server registry, the
//! caller, and any recipient list can all hold the same user, and a handle
//! kept after unregistering still reads the same history. Mutable state
//! (history plus the undo snapshot) sits behind one lock per user.

use std::sync::{Arc, Mutex};

use tracing::debug;

use salon_shared::{Message, Username};
use salon_store::{History, SearchCursor, SentSnapshot};

use crate::error::{Result, ServerError};
use crate::notify::{ConsoleNotifier, Notification, Notifier};
use crate::server::ChatServer;

/// A chat participant: a username plus owned history and undo snapshot.
#[derive(Clone)]
pub struct User {
    shared: Arc<UserShared>,
}

struct UserShared {
    username: Username,
    notifier: Arc<dyn Notifier>,
    state: Mutex<UserState>,
}

#[derive(Default)]
struct UserState {
    history: History,
    snapshot: Option<SentSnapshot>,
}

impl User {
    /// Create a user whose notifications print to stdout.
    pub fn new(username: impl Into<Username>) -> Self {
        Self::with_notifier(username, Arc::new(ConsoleNotifier))
    }

    /// Create a user with a custom notification sink.
    pub fn with_notifier(username: impl Into<Username>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            shared: Arc::new(UserShared {
                username: username.into(),
                notifier,
                state: Mutex::new(UserState::default()),
            }),
        }
    }

    /// The user's stable handle.
    pub fn username(&self) -> &Username {
        &self.shared.username
    }

    /// Send `content` to every user in `recipients` through `server`.
    ///
    /// Pure delegation. The server is the single mediation point and owns
    /// all sender-side bookkeeping, so this never touches local state
    /// directly.
    pub fn send(&self, server: &ChatServer, recipients: &[User], content: &str) -> Result<()> {
        server.deliver(self, recipients, content)?;
        Ok(())
    }

    /// Single-recipient convenience for [`send`](Self::send).
    pub fn send_to(&self, server: &ChatServer, recipient: &User, content: &str) -> Result<()> {
        server.deliver_to(self, recipient, content)?;
        Ok(())
    }

    /// Append an incoming message to this user's history and emit a
    /// receipt notification.
    pub fn receive(&self, message: Arc<Message>) -> Result<()> {
        self.with_state(|state| state.history.append(Arc::clone(&message)))?;
        debug!(user = %self.shared.username, id = %message.id(), "received message");
        self.shared.notifier.notify(&Notification::MessageReceived {
            recipient: self.shared.username.clone(),
            sender: message.sender().clone(),
            content: message.content().to_string(),
        });
        Ok(())
    }

    /// Disarm the undo snapshot, if one is armed.
    ///
    /// Emits a notification either way and returns the undone content, or
    /// `None` when there was nothing left to undo. The user's own history
    /// keeps the message; recipient histories are the server's business
    /// ([`ChatServer::undo`]).
    pub fn undo_last(&self) -> Result<Option<String>> {
        match self.with_state(|state| state.snapshot.take())? {
            Some(snapshot) => {
                self.shared.notifier.notify(&Notification::MessageUndone {
                    user: self.shared.username.clone(),
                    content: snapshot.content.clone(),
                });
                Ok(Some(snapshot.content))
            }
            None => {
                self.shared.notifier.notify(&Notification::NothingToUndo {
                    user: self.shared.username.clone(),
                });
                Ok(None)
            }
        }
    }

    /// This user's history in arrival order, optionally filtered to
    /// messages authored by `filter`.
    pub fn replay(&self, filter: Option<&Username>) -> Result<Vec<Arc<Message>>> {
        self.with_state(|state| state.history.replay(filter))
    }

    /// Cursor over this user's history for messages that involve `target`
    /// as sender or recipient.
    pub fn search(&self, target: &Username) -> Result<SearchCursor> {
        self.with_state(|state| state.history.search(target))
    }

    /// Content of the most recent send, whether or not it was later undone.
    pub fn last_sent(&self) -> Result<Option<String>> {
        self.with_state(|state| state.history.last_sent().map(str::to_string))
    }

    /// The armed undo snapshot, if the latest send is still undoable.
    pub fn snapshot(&self) -> Result<Option<SentSnapshot>> {
        self.with_state(|state| state.snapshot.clone())
    }

    /// Number of messages currently in this user's history.
    pub fn history_len(&self) -> Result<usize> {
        self.with_state(|state| state.history.len())
    }

    /// Sender-side bookkeeping for one delivery: append the message to the
    /// sender's own history, refresh the last-sent slot, and arm the undo
    /// snapshot, all stamped from the message itself.
    pub(crate) fn record_sent(&self, message: &Arc<Message>) -> Result<()> {
        debug!(user = %self.shared.username, id = %message.id(), "recording outgoing message");
        self.with_state(|state| {
            state.history.set_last_sent(message.content());
            state.history.append(Arc::clone(message));
            state.snapshot = Some(SentSnapshot::new(message.content(), message.sent_at()));
        })
    }

    /// Remove the earliest message authored by `sender` from this user's
    /// history, if any.
    pub(crate) fn remove_first_from(&self, sender: &Username) -> Result<Option<Arc<Message>>> {
        self.with_state(|state| state.history.remove_first_from(sender))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut UserState) -> T) -> Result<T> {
        let mut state = self
            .shared
            .state
            .lock()
            .map_err(|_| ServerError::UserStatePoisoned(self.shared.username.clone()))?;
        Ok(f(&mut state))
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("username", &self.shared.username)
            .finish_non_exhaustive()
    }
}
