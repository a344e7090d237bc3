pub mod cache;
pub mod file;
pub mod store;

pub use cache::ConversationHistory;
pub use file::FileHistoryStore;
pub use store::{ChatSessionSummary, HistoryDocument, HistoryError, HistoryStore, NoHistoryStore};

/// Structured cache/storage key. An absent or empty project id normalizes to
/// the literal `"general"` scope, so `(user, None)` and `(user, "general")`
/// address the same log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryKey {
    user_id: String,
    project_id: String,
}

impl HistoryKey {
    pub fn new(user_id: impl Into<String>, project_id: Option<&str>) -> Self {
        let project_id = match project_id {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => "general".to_string(),
        };
        Self {
            user_id: user_id.into(),
            project_id,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Durable document id for this key.
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.user_id, self.project_id)
    }
}
