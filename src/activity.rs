use async_trait::async_trait;

use crate::types::TeamMessage;

#[derive(Debug, thiserror::Error)]
#[error("activity feed error: {0}")]
pub struct ActivityError(pub String);

/// Supplies the recent-activity window: the last N raw team messages,
/// independent of the query. Backed by whatever the host product stores its
/// chat in; failures here only cost the prompt its activity block.
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// Most recent messages for a team, oldest first, at most `limit`.
    async fn recent_messages(
        &self,
        team_id: &str,
        limit: usize,
    ) -> Result<Vec<TeamMessage>, ActivityError>;
}

/// For callers without a chat feed: the activity block is always empty.
pub struct NoActivityFeed;

#[async_trait]
impl ActivityFeed for NoActivityFeed {
    async fn recent_messages(
        &self,
        _: &str,
        _: usize,
    ) -> Result<Vec<TeamMessage>, ActivityError> {
        Ok(Vec::new())
    }
}
