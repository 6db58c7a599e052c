//! The mediation server.
//!
//! Every exchange goes through [`ChatServer`]: message fan-out, block-list
//! enforcement, and the fan-in removal behind undo all live here, so users
//! never talk to each other directly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use salon_shared::{Message, Username};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::user::User;

/// Mediator owning the user registry and the per-user block lists.
pub struct ChatServer {
    config: ServerConfig,
    state: Mutex<ServerState>,
}

#[derive(Default)]
struct ServerState {
    /// username -> registered handle. A username holds at most one entry.
    users: HashMap<Username, User>,
    /// blocker -> usernames whose messages the blocker refuses.
    ///
    /// Deliberately a Vec rather than a set: repeated blocks of the same
    /// user accumulate duplicate entries, and the containment check makes
    /// the duplicates harmless.
    blocklist: HashMap<Username, Vec<Username>>,
}

impl ServerState {
    /// Blocking is unidirectional: it suppresses messages *from* `sender`
    /// *to* `recipient`, never the reverse direction.
    fn is_blocked(&self, sender: &Username, recipient: &Username) -> bool {
        self.blocklist
            .get(recipient)
            .is_some_and(|blocked| blocked.contains(sender))
    }
}

impl ChatServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ServerState::default()),
        }
    }

    /// Human-readable name of this instance.
    pub fn instance_name(&self) -> &str {
        &self.config.instance_name
    }

    /// Insert `user` into the registry. Registering a username that is
    /// already taken replaces the previous handle.
    pub fn register(&self, user: &User) -> Result<()> {
        let mut state = self.lock_state()?;
        let previous = state.users.insert(user.username().clone(), user.clone());
        drop(state);
        if previous.is_some() {
            warn!(user = %user.username(), "re-registered username, replacing previous handle");
        } else {
            debug!(user = %user.username(), "registered user");
        }
        Ok(())
    }

    /// Remove `user` from the registry along with their own block list.
    ///
    /// Appearances of this username inside *other* users' block lists are
    /// kept: entries match incoming senders by name, so a stale one simply
    /// keeps refusing that name.
    pub fn unregister(&self, user: &User) -> Result<()> {
        let mut state = self.lock_state()?;
        state.users.remove(user.username());
        state.blocklist.remove(user.username());
        drop(state);
        debug!(user = %user.username(), "unregistered user");
        Ok(())
    }

    /// Build a message from `sender` and fan it out to `recipients`.
    ///
    /// Sender-side bookkeeping happens exactly once, here: history append,
    /// last-sent slot, and the undo snapshot, all stamped with the
    /// message's own timestamp. The fan-out then skips the sender and
    /// every recipient whose block list names the sender; everyone else
    /// receives one shared copy, in recipient-list order. Suppression is
    /// silent on the sender side.
    pub fn deliver(
        &self,
        sender: &User,
        recipients: &[User],
        content: &str,
    ) -> Result<Arc<Message>> {
        let recipient_names = recipients.iter().map(|r| r.username().clone()).collect();
        let message = Arc::new(Message::new(
            sender.username().clone(),
            recipient_names,
            content,
        ));

        sender.record_sent(&message)?;

        let eligible = self.eligible_recipients(sender, recipients)?;
        debug!(
            sender = %sender.username(),
            id = %message.id(),
            addressed = recipients.len(),
            delivered = eligible.len(),
            "fanning out message"
        );
        for recipient in &eligible {
            recipient.receive(Arc::clone(&message))?;
        }

        Ok(message)
    }

    /// Single-recipient convenience for [`deliver`](Self::deliver).
    pub fn deliver_to(&self, sender: &User, recipient: &User, content: &str) -> Result<Arc<Message>> {
        self.deliver(sender, std::slice::from_ref(recipient), content)
    }

    /// Undo `sender`'s most recent message.
    ///
    /// Disarms the sender's snapshot (notifying them either way) and
    /// removes the earliest message authored by `sender` from each
    /// recipient's history, first match only. The walk happens exactly as
    /// the recipient list was passed, whether or not a snapshot was still
    /// armed, and the sender's own history keeps its copy.
    pub fn undo(&self, sender: &User, recipients: &[User]) -> Result<()> {
        let undone = sender.undo_last()?;
        if undone.is_none() {
            debug!(sender = %sender.username(), "undo requested with no armed snapshot");
        }
        for recipient in recipients {
            if let Some(message) = recipient.remove_first_from(sender.username())? {
                debug!(
                    sender = %sender.username(),
                    recipient = %recipient.username(),
                    id = %message.id(),
                    "retracted message from recipient history"
                );
            }
        }
        Ok(())
    }

    /// Single-recipient convenience for [`undo`](Self::undo).
    pub fn undo_for(&self, sender: &User, recipient: &User) -> Result<()> {
        self.undo(sender, std::slice::from_ref(recipient))
    }

    /// Add `blocked` to `blocker`'s block list, so future messages from
    /// `blocked` no longer reach `blocker`. Unidirectional, and repeated
    /// calls append duplicate entries.
    pub fn block(&self, blocker: &User, blocked: &User) -> Result<()> {
        let mut state = self.lock_state()?;
        state
            .blocklist
            .entry(blocker.username().clone())
            .or_default()
            .push(blocked.username().clone());
        drop(state);
        debug!(
            blocker = %blocker.username(),
            blocked = %blocked.username(),
            "added block-list entry"
        );
        Ok(())
    }

    /// Look up a registered user by name.
    pub fn user(&self, username: &Username) -> Result<Option<User>> {
        Ok(self.lock_state()?.users.get(username).cloned())
    }

    /// Whether `username` is currently registered.
    pub fn is_registered(&self, username: &Username) -> Result<bool> {
        Ok(self.lock_state()?.users.contains_key(username))
    }

    /// All registered usernames, in no particular order.
    pub fn usernames(&self) -> Result<Vec<Username>> {
        Ok(self.lock_state()?.users.keys().cloned().collect())
    }

    /// Number of registered users.
    pub fn user_count(&self) -> Result<usize> {
        Ok(self.lock_state()?.users.len())
    }

    /// The raw block-list entries for `blocker`, duplicates included.
    pub fn blocked_usernames(&self, blocker: &Username) -> Result<Vec<Username>> {
        Ok(self
            .lock_state()?
            .blocklist
            .get(blocker)
            .cloned()
            .unwrap_or_default())
    }

    /// Resolve the delivery targets for one fan-out while holding the
    /// registry lock, then release it before any user state is touched.
    fn eligible_recipients(&self, sender: &User, recipients: &[User]) -> Result<Vec<User>> {
        let state = self.lock_state()?;
        let mut eligible = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            if recipient.username() == sender.username() {
                continue;
            }
            if state.is_blocked(sender.username(), recipient.username()) {
                debug!(
                    sender = %sender.username(),
                    recipient = %recipient.username(),
                    "delivery suppressed by block list"
                );
                continue;
            }
            if self.config.require_registered && !state.users.contains_key(recipient.username()) {
                warn!(
                    recipient = %recipient.username(),
                    "skipping unregistered recipient"
                );
                continue;
            }
            eligible.push(recipient.clone());
        }
        Ok(eligible)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ServerState>> {
        self.state.lock().map_err(|_| ServerError::ServerStatePoisoned)
    }
}

impl Default for ChatServer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use salon_store::StoreError;

    fn quiet_user(name: &str) -> User {
        User::with_notifier(name, Arc::new(MemoryNotifier::new()))
    }

    fn observed_user(name: &str) -> (User, MemoryNotifier) {
        let notifier = MemoryNotifier::new();
        let user = User::with_notifier(name, Arc::new(notifier.clone()));
        (user, notifier)
    }

    fn contents(messages: &[Arc<Message>]) -> Vec<String> {
        messages.iter().map(|m| m.content().to_string()).collect()
    }

    #[test]
    fn test_delivery_appends_in_call_order() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");

        alice.send(&server, &[bob.clone()], "first").unwrap();
        alice.send(&server, &[bob.clone()], "second").unwrap();

        assert_eq!(contents(&bob.replay(None).unwrap()), vec!["first", "second"]);
    }

    #[test]
    fn test_recipients_share_one_message() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");
        let charlie = quiet_user("charlie");

        let message = server
            .deliver(&alice, &[bob.clone(), charlie.clone()], "hi both")
            .unwrap();

        let bob_copy = &bob.replay(None).unwrap()[0];
        let charlie_copy = &charlie.replay(None).unwrap()[0];
        assert!(Arc::ptr_eq(bob_copy, &message));
        assert!(Arc::ptr_eq(charlie_copy, &message));
    }

    #[test]
    fn test_sender_excluded_from_own_fanout() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");

        alice
            .send(&server, &[alice.clone(), bob.clone()], "echo?")
            .unwrap();

        // One copy from sender-side bookkeeping, none from fan-out.
        assert_eq!(alice.history_len().unwrap(), 1);
        assert_eq!(bob.history_len().unwrap(), 1);
    }

    #[test]
    fn test_sender_bookkeeping_on_deliver() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");

        let message = server.deliver(&alice, &[bob.clone()], "Hello").unwrap();

        assert_eq!(alice.last_sent().unwrap(), Some("Hello".to_string()));
        let snapshot = alice.snapshot().unwrap().unwrap();
        assert_eq!(snapshot.content, "Hello");
        assert_eq!(snapshot.sent_at, message.sent_at());
        assert_eq!(contents(&alice.replay(None).unwrap()), vec!["Hello"]);
    }

    #[test]
    fn test_block_suppresses_delivery_silently() {
        let server = ChatServer::new();
        let (alice, alice_events) = observed_user("alice");
        let bob = quiet_user("bob");
        let charlie = quiet_user("charlie");

        server.block(&alice, &bob).unwrap();
        bob.send(&server, &[alice.clone(), charlie.clone()], "psst")
            .unwrap();

        assert_eq!(alice.history_len().unwrap(), 0);
        assert!(alice_events.events().is_empty());
        // Other recipients and the sender's bookkeeping are unaffected.
        assert_eq!(contents(&charlie.replay(None).unwrap()), vec!["psst"]);
        assert_eq!(bob.last_sent().unwrap(), Some("psst".to_string()));
    }

    #[test]
    fn test_blocking_is_unidirectional() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");

        server.block(&alice, &bob).unwrap();
        alice.send(&server, &[bob.clone()], "still here").unwrap();

        assert_eq!(contents(&bob.replay(None).unwrap()), vec!["still here"]);
    }

    #[test]
    fn test_duplicate_block_entries_accumulate() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");

        server.block(&alice, &bob).unwrap();
        server.block(&alice, &bob).unwrap();

        let entries = server.blocked_usernames(alice.username()).unwrap();
        assert_eq!(entries.len(), 2);

        bob.send(&server, &[alice.clone()], "blocked twice").unwrap();
        assert_eq!(alice.history_len().unwrap(), 0);
    }

    #[test]
    fn test_undo_retracts_from_recipients_only() {
        let server = ChatServer::new();
        let (alice, alice_events) = observed_user("alice");
        let bob = quiet_user("bob");
        let charlie = quiet_user("charlie");

        alice
            .send(&server, &[bob.clone(), charlie.clone()], "oops")
            .unwrap();
        server.undo(&alice, &[bob.clone(), charlie.clone()]).unwrap();

        assert_eq!(bob.history_len().unwrap(), 0);
        assert_eq!(charlie.history_len().unwrap(), 0);
        // The sender keeps their copy and the last-sent record.
        assert_eq!(contents(&alice.replay(None).unwrap()), vec!["oops"]);
        assert_eq!(alice.last_sent().unwrap(), Some("oops".to_string()));
        assert!(alice.snapshot().unwrap().is_none());
        assert_eq!(
            alice_events.events().last().map(ToString::to_string),
            Some("[alice] Undid last message: oops".to_string())
        );
    }

    #[test]
    fn test_undo_removes_first_match_only() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");

        alice.send(&server, &[bob.clone()], "first").unwrap();
        alice.send(&server, &[bob.clone()], "second").unwrap();
        server.undo_for(&alice, &bob).unwrap();

        // Earliest match goes, not the one the snapshot described.
        assert_eq!(contents(&bob.replay(None).unwrap()), vec!["second"]);
    }

    #[test]
    fn test_second_send_commits_the_first() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");

        alice.send(&server, &[bob.clone()], "committed").unwrap();
        alice.send(&server, &[bob.clone()], "undoable").unwrap();

        let snapshot = alice.snapshot().unwrap().unwrap();
        assert_eq!(snapshot.content, "undoable");
    }

    #[test]
    fn test_undo_walks_recipients_even_without_snapshot() {
        let server = ChatServer::new();
        let (alice, alice_events) = observed_user("alice");
        let bob = quiet_user("bob");

        alice.send(&server, &[bob.clone()], "lingering").unwrap();
        // First undo targets nobody, so bob keeps the message but the
        // snapshot is disarmed.
        server.undo(&alice, &[]).unwrap();
        assert_eq!(bob.history_len().unwrap(), 1);

        server.undo_for(&alice, &bob).unwrap();

        assert_eq!(bob.history_len().unwrap(), 0);
        assert_eq!(
            alice_events.events().last().map(ToString::to_string),
            Some("[alice] No messages to undo".to_string())
        );
    }

    #[test]
    fn test_reregistering_replaces_previous_handle() {
        let server = ChatServer::new();
        let first = quiet_user("alice");
        let second = quiet_user("alice");

        server.register(&first).unwrap();
        server.register(&second).unwrap();

        assert_eq!(server.user_count().unwrap(), 1);
        let registered = server.user(first.username()).unwrap().unwrap();
        registered
            .receive(Arc::new(Message::new(
                Username::from("bob"),
                vec![Username::from("alice")],
                "which alice?",
            )))
            .unwrap();
        assert_eq!(first.history_len().unwrap(), 0);
        assert_eq!(second.history_len().unwrap(), 1);
    }

    #[test]
    fn test_unregister_purges_own_block_entries_only() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");
        server.register(&alice).unwrap();
        server.register(&bob).unwrap();
        server.block(&alice, &bob).unwrap();
        server.block(&bob, &alice).unwrap();

        server.unregister(&alice).unwrap();

        assert!(!server.is_registered(alice.username()).unwrap());
        assert!(server.blocked_usernames(alice.username()).unwrap().is_empty());
        // Bob's list still names alice.
        assert_eq!(
            server.blocked_usernames(bob.username()).unwrap(),
            vec![alice.username().clone()]
        );
    }

    #[test]
    fn test_unregistered_recipients_receive_by_default() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let ghost = quiet_user("ghost");
        server.register(&alice).unwrap();

        alice.send(&server, &[ghost.clone()], "anyone there?").unwrap();

        assert_eq!(ghost.history_len().unwrap(), 1);
    }

    #[test]
    fn test_require_registered_skips_unknown_recipients() {
        let config = ServerConfig {
            require_registered: true,
            ..ServerConfig::default()
        };
        let server = ChatServer::with_config(config);
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");
        let ghost = quiet_user("ghost");
        server.register(&alice).unwrap();
        server.register(&bob).unwrap();

        alice
            .send(&server, &[bob.clone(), ghost.clone()], "hello?")
            .unwrap();

        assert_eq!(bob.history_len().unwrap(), 1);
        assert_eq!(ghost.history_len().unwrap(), 0);
    }

    // The end-to-end exchange: five sends, a sender-filtered replay, an
    // undo fanned into two histories, a block, and a cursor walk.
    #[test]
    fn test_full_exchange() {
        let server = ChatServer::new();
        let alice = quiet_user("alice");
        let bob = quiet_user("bob");
        let charlie = quiet_user("charlie");
        for user in [&alice, &bob, &charlie] {
            server.register(user).unwrap();
        }

        alice
            .send(&server, &[bob.clone(), charlie.clone()], "Hello everyone!")
            .unwrap();
        bob.send(&server, &[alice.clone()], "Hi Alice!").unwrap();
        charlie.send_to(&server, &bob, "Hey Bob!").unwrap();
        charlie
            .send(&server, &[bob.clone(), alice.clone()], "Hi Alice and Bob!")
            .unwrap();
        charlie.send_to(&server, &alice, "How are you Alice?").unwrap();

        assert_eq!(
            contents(&bob.replay(Some(alice.username())).unwrap()),
            vec!["Hello everyone!"]
        );

        server.undo(&alice, &[bob.clone(), charlie.clone()]).unwrap();
        assert_eq!(
            contents(&bob.replay(None).unwrap()),
            vec!["Hi Alice!", "Hey Bob!", "Hi Alice and Bob!"]
        );
        assert!(contents(&charlie.replay(None).unwrap())
            .iter()
            .all(|c| c != "Hello everyone!"));
        assert_eq!(contents(&alice.replay(None).unwrap())[0], "Hello everyone!");

        server.block(&alice, &bob).unwrap();
        bob.send(&server, &[alice.clone(), charlie.clone()], "How's it going?")
            .unwrap();
        assert!(contents(&alice.replay(None).unwrap())
            .iter()
            .all(|c| c != "How's it going?"));

        let mut cursor = charlie.search(bob.username()).unwrap();
        let mut seen = Vec::new();
        while cursor.has_next() {
            seen.push(cursor.next().unwrap().content().to_string());
        }
        assert_eq!(seen, vec!["Hey Bob!", "Hi Alice and Bob!", "How's it going?"]);
        assert!(matches!(cursor.next(), Err(StoreError::CursorExhausted(_))));
    }
}
