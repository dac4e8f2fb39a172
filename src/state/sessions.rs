use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Notify, mpsc};
use tracing::info;
use uuid::Uuid;

use crate::state::room::RoomPin;

/// Handle used to push messages to a connected player.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    /// Identifies this connection among sessions of the same player.
    pub id: Uuid,
    /// Writer channel of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
    kick: Arc<Notify>,
}

impl SessionHandle {
    /// Build a handle for a fresh connection.
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
            kick: Arc::new(Notify::new()),
        }
    }

    /// Resolves once a newer session displaced this one.
    pub async fn displaced(&self) {
        self.kick.notified().await;
    }
}

type SessionKey = (RoomPin, String);

/// Registry of live player sessions keyed by room and nickname.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionKey, SessionHandle>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` for `(pin, nickname)`, displacing any older session.
    ///
    /// The displaced session receives a close frame and its
    /// [`SessionHandle::displaced`] future resolves.
    pub fn register(&self, pin: RoomPin, nickname: &str, handle: SessionHandle) {
        let previous = self.sessions.insert((pin, nickname.to_owned()), handle);
        if let Some(previous) = previous {
            info!(pin = %pin, nickname, session = %previous.id, "displacing older player session");
            let _ = previous.tx.send(Message::Close(None));
            previous.kick.notify_one();
        }
    }

    /// Remove the session of `(pin, nickname)` if it is still `id`.
    ///
    /// Returns whether a session was removed.
    pub fn deregister(&self, pin: RoomPin, nickname: &str, id: Uuid) -> bool {
        self.sessions
            .remove_if(&(pin, nickname.to_owned()), |_, handle| handle.id == id)
            .is_some()
    }

    /// Current session of a player.
    pub fn get(&self, pin: RoomPin, nickname: &str) -> Option<SessionHandle> {
        self.sessions
            .get(&(pin, nickname.to_owned()))
            .map(|entry| entry.value().clone())
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pin() -> RoomPin {
        RoomPin::try_from(1234i64).unwrap()
    }

    #[tokio::test]
    async fn duplicate_login_displaces_older_session() {
        let registry = SessionRegistry::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let old = SessionHandle::new(old_tx);
        registry.register(pin(), "alice", old.clone());

        let (new_tx, _new_rx) = mpsc::unbounded_channel();
        let new = SessionHandle::new(new_tx);
        registry.register(pin(), "alice", new.clone());

        assert!(matches!(old_rx.recv().await, Some(Message::Close(None))));
        tokio::time::timeout(Duration::from_secs(1), old.displaced())
            .await
            .expect("older session should be kicked");
        assert_eq!(registry.get(pin(), "alice").unwrap().id, new.id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deregister_only_removes_the_owning_session() {
        let registry = SessionRegistry::new();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let old = SessionHandle::new(old_tx);
        registry.register(pin(), "alice", old.clone());

        let (new_tx, _new_rx) = mpsc::unbounded_channel();
        let new = SessionHandle::new(new_tx);
        registry.register(pin(), "alice", new.clone());

        assert!(!registry.deregister(pin(), "alice", old.id));
        assert!(registry.get(pin(), "alice").is_some());
        assert!(registry.deregister(pin(), "alice", new.id));
        assert!(registry.is_empty());
    }
}
