use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scope key for entries without a team. Matches the history store's
/// normalization of an absent project id.
pub const GENERAL_SCOPE: &str = "general";

/// What kind of content an indexed entry holds. A closed set: the knowledge
/// search filter is a match on this, not a string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum EntryKind {
    /// A chat message, ingested from the team-chat feed.
    Text { sender_id: String },
    /// An ingested project fact.
    ProjectInfo { project_name: String },
    /// An ingested code snippet.
    CodeSnippet { language: String },
}

impl EntryKind {
    /// Wire label, as stored in payloads and surfaced in citations.
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Text { .. } => "text",
            EntryKind::ProjectInfo { .. } => "project_info",
            EntryKind::CodeSnippet { .. } => "code_snippet",
        }
    }

    /// Whether this kind belongs to the knowledge base (as opposed to chat).
    pub fn is_knowledge(&self) -> bool {
        matches!(
            self,
            EntryKind::ProjectInfo { .. } | EntryKind::CodeSnippet { .. }
        )
    }
}

/// Shared metadata stored with every entry. The scope (`team_id`) is
/// immutable after insertion; an empty string means global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub team_id: String,
    pub sender_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EntryKind,
}

/// One unit inserted into the semantic index. The id is stable across
/// re-ingestion of the same logical entity, so re-ingesting upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEntry {
    pub id: String,
    pub content: String,
    pub metadata: EntryMetadata,
}

/// A record from the external chat-message ingestion feed. Batch ingestion
/// accepts only `message_type == "text"` records with non-empty content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub message_id: String,
    pub content: String,
    pub message_type: String,
    pub sender_name: String,
    pub sender_id: String,
    pub team_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Transient per-query result. `relevance = clamp(1 - distance, 0, 1)`.
#[derive(Debug, Clone)]
pub struct RetrievedItem {
    pub content: String,
    pub kind: EntryKind,
    pub sender_name: String,
    pub timestamp: DateTime<Utc>,
    pub relevance: f32,
    pub team_id: String,
}
