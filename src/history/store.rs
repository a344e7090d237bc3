use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::HistoryKey;
use crate::types::ConversationTurn;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("store error: {0}")]
    Store(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The durable record for one conversation log. `clear` empties `messages`
/// but keeps the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryDocument {
    pub user_id: String,
    pub project_id: String,
    pub messages: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// One row in a user's chat-session listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSessionSummary {
    pub project_id: String,
    pub message_count: usize,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Durable side of the conversation history. The cache treats this as the
/// source of truth on cold start; writes go through one turn at a time.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Fetch the document for a key, or `None` if it has never been written.
    async fn load(&self, key: &HistoryKey) -> Result<Option<HistoryDocument>, HistoryError>;

    /// Persist a single new turn: creates the document if absent, otherwise
    /// appends to its message array.
    async fn append(&self, key: &HistoryKey, turn: &ConversationTurn) -> Result<(), HistoryError>;

    /// Empty the document's message array without deleting the document.
    /// A missing document is a no-op.
    async fn clear(&self, key: &HistoryKey) -> Result<(), HistoryError>;

    /// Summaries of every conversation log this user has, across projects.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ChatSessionSummary>, HistoryError>;
}

/// No persistence. History lives only in the cache and is gone on restart.
pub struct NoHistoryStore;

#[async_trait]
impl HistoryStore for NoHistoryStore {
    async fn load(&self, _: &HistoryKey) -> Result<Option<HistoryDocument>, HistoryError> {
        Ok(None)
    }

    async fn append(&self, _: &HistoryKey, _: &ConversationTurn) -> Result<(), HistoryError> {
        Ok(())
    }

    async fn clear(&self, _: &HistoryKey) -> Result<(), HistoryError> {
        Ok(())
    }

    async fn list_for_user(&self, _: &str) -> Result<Vec<ChatSessionSummary>, HistoryError> {
        Ok(Vec::new())
    }
}
