//! Per-connection session registry for the full-duplex transport.
//!
//! One transcript per live WebSocket connection, created on open and
//! destroyed on close. Each connection is driven by a single handler task,
//! so the mutex only guards the map itself; lock sections never await.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::error::{RelayError, Result};
use crate::models::{ChatMessage, Transcript};

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Transcript>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fresh transcript for a newly opened connection.
    pub fn create(&self, id: Uuid, system_prompt: &str) {
        self.lock().insert(id, Transcript::seeded(system_prompt));
        tracing::debug!(connection = %id, "session created");
    }

    /// Clone of the current transcript, for sending upstream.
    pub fn snapshot(&self, id: Uuid) -> Result<Vec<ChatMessage>> {
        self.with(id, |t| t.messages().to_vec())
    }

    pub fn append(&self, id: Uuid, message: ChatMessage) -> Result<()> {
        self.with(id, |t| t.push(message))
    }

    /// Apply the rolling-window cut. Runs only between turns.
    pub fn truncate(&self, id: Uuid) -> Result<()> {
        self.with(id, |t| t.truncate_window())
    }

    /// Drop all state for a closed connection.
    pub fn destroy(&self, id: Uuid) {
        self.lock().remove(&id);
        tracing::debug!(connection = %id, "session destroyed");
    }

    /// Mutate a transcript under the lock. Used to apply a whole user turn
    /// atomically with respect to other registry operations.
    pub fn with<R>(&self, id: Uuid, f: impl FnOnce(&mut Transcript) -> R) -> Result<R> {
        let mut sessions = self.lock();
        let transcript = sessions.get_mut(&id).ok_or(RelayError::Session(id))?;
        Ok(f(transcript))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Transcript>> {
        // A poisoned map still holds consistent transcripts; recover it.
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn create_seeds_system_message() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        store.create(id, "sys");
        let messages = store.snapshot(id).expect("session should exist");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::System);
    }

    #[test]
    fn unknown_session_is_an_error() {
        let store = SessionStore::new();
        let err = store.snapshot(Uuid::new_v4());
        assert!(matches!(err, Err(RelayError::Session(_))));
    }

    #[test]
    fn append_preserves_order() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        store.create(id, "sys");
        store.append(id, ChatMessage::user("一")).expect("append");
        store.append(id, ChatMessage::assistant("二")).expect("append");
        let messages = store.snapshot(id).expect("snapshot");
        assert_eq!(messages[1].content, "一");
        assert_eq!(messages[2].content, "二");
    }

    #[test]
    fn truncate_enforces_window() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        store.create(id, "sys");
        for i in 0..24 {
            store
                .append(id, ChatMessage::user(format!("m{i}")))
                .expect("append");
        }
        store.truncate(id).expect("truncate");
        let messages = store.snapshot(id).expect("snapshot");
        assert_eq!(messages.len(), 19);
        assert_eq!(messages[0].role, Role::System);
    }

    #[test]
    fn destroy_releases_state() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        store.create(id, "sys");
        assert_eq!(store.len(), 1);
        store.destroy(id);
        assert!(store.is_empty());
        assert!(store.snapshot(id).is_err());
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.create(a, "sys");
        store.create(b, "sys");
        store.append(a, ChatMessage::user("只有 a")).expect("append");
        assert_eq!(store.snapshot(a).expect("a").len(), 2);
        assert_eq!(store.snapshot(b).expect("b").len(), 1);
    }
}
