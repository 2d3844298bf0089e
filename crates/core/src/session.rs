//! Session store trait: bounded, per-conversation turn history.
//!
//! A store maps a [`ConversationId`] to the ordered user/assistant turns of
//! that conversation. Writers must hold the conversation's [`SessionGuard`]
//! across the whole read-modify-write of an exchange; the store hands out one
//! guard per conversation at a time, so two concurrent turns on the same id
//! are serialized instead of losing an update.

use async_trait::async_trait;

use crate::error::SessionError;
use crate::message::{ConversationId, Message};

/// Turns retained per conversation (8 user/assistant exchanges).
pub const DEFAULT_MAX_TURNS: usize = 16;

/// Exclusive access to one conversation, released on drop.
pub type SessionGuard = tokio::sync::OwnedMutexGuard<()>;

/// The core SessionStore trait.
///
/// Implementations: in-memory (`kai-memory`). Nothing is persisted across
/// process restarts and conversations are never evicted.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Acquire the per-conversation lock. Waits while another exchange on the
    /// same conversation is in flight.
    async fn lock(&self, id: &ConversationId) -> Result<SessionGuard, SessionError>;

    /// Snapshot of the stored history, or `None` for an unknown conversation.
    async fn get(&self, id: &ConversationId) -> Result<Option<Vec<Message>>, SessionError>;

    /// Replace the stored history. The store keeps only the most recent
    /// `max_turns()` entries.
    async fn put(&self, id: &ConversationId, history: Vec<Message>) -> Result<(), SessionError>;

    /// Number of known conversations.
    async fn count(&self) -> Result<usize, SessionError>;

    /// Upper bound on stored turns per conversation.
    fn max_turns(&self) -> usize {
        DEFAULT_MAX_TURNS
    }
}

/// Drop the oldest entries so that at most `max_turns` remain.
pub fn trim_history(history: &mut Vec<Message>, max_turns: usize) {
    if history.len() > max_turns {
        let excess = history.len() - max_turns;
        history.drain(..excess);
    }
}
