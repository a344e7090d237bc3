use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who spoke in a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when the turn is rendered into a prompt.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One turn in a per-user, per-project conversation log. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A raw team-chat message, as supplied by the activity feed for the
/// recent-activity prompt block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMessage {
    pub sender_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// What the request-handling layer hands to the assistant.
#[derive(Debug, Clone)]
pub struct AssistantRequest {
    pub user_id: String,
    pub message: String,
    /// Scopes history and retrieval. `None` means the "general" conversation
    /// with global retrieval.
    pub project_id: Option<String>,
    /// When false, the prompt carries only persona + conversation + question.
    pub use_rag: bool,
}

impl AssistantRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            project_id: None,
            use_rag: true,
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn without_rag(mut self) -> Self {
        self.use_rag = false;
        self
    }
}

/// Citation-facing copy of one retrieved item, returned alongside the answer.
/// Content is clipped to 100 characters with an ellipsis marker; never fed
/// back into the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub sender: String,
    pub content: String,
    pub timestamp: String,
    pub relevance: f32,
}

/// Successful assistant reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    pub response: String,
    pub sources: Vec<SourceRef>,
    pub timestamp: DateTime<Utc>,
    pub project_context: String,
}
