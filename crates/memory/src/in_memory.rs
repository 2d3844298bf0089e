//! In-memory session store: conversation history for the life of the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kai_core::error::SessionError;
use kai_core::message::{ConversationId, Message};
use kai_core::session::{DEFAULT_MAX_TURNS, SessionGuard, SessionStore, trim_history};
use tokio::sync::{Mutex, RwLock};

/// Stores each conversation's turns in a `HashMap`.
///
/// Conversations are never evicted; the map grows with every new
/// conversation id until the process exits.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<ConversationId, Vec<Message>>>,
    /// One async mutex per conversation with an exchange in flight. The
    /// outer `std` mutex is never held across an await.
    locks: std::sync::Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>,
    max_turns: usize,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_max_turns(DEFAULT_MAX_TURNS)
    }

    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            locks: std::sync::Mutex::new(HashMap::new()),
            max_turns,
        }
    }

    /// The mutex for `id`. Entries nobody holds or waits on are dropped
    /// first, so the map only tracks conversations with an exchange in flight.
    fn conversation_lock(&self, id: &ConversationId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(id.clone()).or_default().clone()
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn lock(&self, id: &ConversationId) -> Result<SessionGuard, SessionError> {
        Ok(self.conversation_lock(id).lock_owned().await)
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Vec<Message>>, SessionError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn put(&self, id: &ConversationId, mut history: Vec<Message>) -> Result<(), SessionError> {
        trim_history(&mut history, self.max_turns);
        tracing::trace!(conversation_id = %id, turns = history.len(), "Storing session history");
        self.sessions.write().await.insert(id.clone(), history);
        Ok(())
    }

    async fn count(&self) -> Result<usize, SessionError> {
        Ok(self.sessions.read().await.len())
    }

    fn max_turns(&self) -> usize {
        self.max_turns
    }
}
