use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::warn;

use super::store::{ChatSessionSummary, HistoryStore};
use super::HistoryKey;
use crate::types::{ConversationTurn, Role};

/// Bound on a conversation log. Appends past this trim the oldest turns.
pub const MAX_TURNS: usize = 20;

struct LogSlot {
    loaded: bool,
    turns: Vec<ConversationTurn>,
}

/// Read-through cache over the durable history store, keyed by
/// `(user, project)`. Every mutation for a key runs under that key's own
/// lock, so concurrent appends are linearized and the trim never works from
/// a stale read. The outer map lock is held only to look up or create a
/// slot, never across store IO.
///
/// Known consistency gap: the cache mutation always succeeds even when the
/// durable write fails, so a crash can lose the in-flight turn. The cache is
/// rebuilt from the store on restart, so the turn is lost, not duplicated.
pub struct ConversationHistory {
    store: Arc<dyn HistoryStore>,
    slots: Mutex<HashMap<HistoryKey, Arc<Mutex<LogSlot>>>>,
    max_turns: usize,
}

impl ConversationHistory {
    pub fn new(store: impl HistoryStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
            slots: Mutex::new(HashMap::new()),
            max_turns: MAX_TURNS,
        }
    }

    async fn slot(&self, key: &HistoryKey) -> Arc<Mutex<LogSlot>> {
        let mut slots = self.slots.lock().await;
        slots
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(LogSlot {
                    loaded: false,
                    turns: Vec::new(),
                }))
            })
            .clone()
    }

    /// Miss policy: load the durable document, or start empty when there is
    /// none or the load fails. Either way the slot counts as loaded after.
    async fn ensure_loaded(&self, key: &HistoryKey, slot: &mut LogSlot) {
        if slot.loaded {
            return;
        }
        match self.store.load(key).await {
            Ok(Some(doc)) => slot.turns = doc.messages,
            Ok(None) => {}
            Err(e) => {
                warn!(doc_id = %key.doc_id(), error = %e, "history load failed, starting empty");
            }
        }
        slot.loaded = true;
    }

    /// The cached log for a key, oldest first. Cold misses load from the
    /// durable store and populate the cache before returning.
    pub async fn get(&self, user_id: &str, project_id: Option<&str>) -> Vec<ConversationTurn> {
        let key = HistoryKey::new(user_id, project_id);
        let slot = self.slot(&key).await;
        let mut slot = slot.lock().await;
        self.ensure_loaded(&key, &mut slot).await;
        slot.turns.clone()
    }

    /// Append one turn stamped with the current time, trim to the most
    /// recent `MAX_TURNS`, and persist the single new turn. The in-memory
    /// append always succeeds; a failed durable write is logged and absorbed.
    pub async fn append(
        &self,
        user_id: &str,
        project_id: Option<&str>,
        role: Role,
        content: &str,
    ) {
        let key = HistoryKey::new(user_id, project_id);
        let slot = self.slot(&key).await;
        let mut slot = slot.lock().await;
        self.ensure_loaded(&key, &mut slot).await;

        let turn = ConversationTurn {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        slot.turns.push(turn.clone());
        if slot.turns.len() > self.max_turns {
            let excess = slot.turns.len() - self.max_turns;
            slot.turns.drain(..excess);
        }

        if let Err(e) = self.store.append(&key, &turn).await {
            warn!(doc_id = %key.doc_id(), error = %e, "history persist failed, cache is ahead of store");
        }
    }

    /// Empty the log for a key, in cache and in the durable record. The
    /// durable record itself stays.
    pub async fn clear(&self, user_id: &str, project_id: Option<&str>) {
        let key = HistoryKey::new(user_id, project_id);
        let slot = self.slot(&key).await;
        let mut slot = slot.lock().await;
        slot.turns.clear();
        slot.loaded = true;

        if let Err(e) = self.store.clear(&key).await {
            warn!(doc_id = %key.doc_id(), error = %e, "history clear failed in durable store");
        }
    }

    /// All of a user's conversation logs across projects, from the durable
    /// store. Empty on store failure.
    pub async fn sessions(&self, user_id: &str) -> Vec<ChatSessionSummary> {
        match self.store.list_for_user(user_id).await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(user_id, error = %e, "session listing failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::file::FileHistoryStore;
    use crate::history::store::{HistoryDocument, HistoryError, NoHistoryStore};
    use async_trait::async_trait;

    struct FailingStore;

    #[async_trait]
    impl HistoryStore for FailingStore {
        async fn load(&self, _: &HistoryKey) -> Result<Option<HistoryDocument>, HistoryError> {
            Err(HistoryError::Store("down".into()))
        }
        async fn append(
            &self,
            _: &HistoryKey,
            _: &ConversationTurn,
        ) -> Result<(), HistoryError> {
            Err(HistoryError::Store("down".into()))
        }
        async fn clear(&self, _: &HistoryKey) -> Result<(), HistoryError> {
            Err(HistoryError::Store("down".into()))
        }
        async fn list_for_user(
            &self,
            _: &str,
        ) -> Result<Vec<ChatSessionSummary>, HistoryError> {
            Err(HistoryError::Store("down".into()))
        }
    }

    #[tokio::test]
    async fn appends_trim_to_twenty_most_recent() {
        let history = ConversationHistory::new(NoHistoryStore);
        for i in 0..25 {
            history
                .append("u1", Some("p1"), Role::User, &format!("turn {i}"))
                .await;
        }

        let turns = history.get("u1", Some("p1")).await;
        assert_eq!(turns.len(), 20);
        assert_eq!(turns[0].content, "turn 5");
        assert_eq!(turns[19].content, "turn 24");
    }

    #[tokio::test]
    async fn short_logs_keep_everything_in_order() {
        let history = ConversationHistory::new(NoHistoryStore);
        for i in 0..7 {
            history.append("u1", None, Role::User, &format!("t{i}")).await;
        }

        let turns = history.get("u1", None).await;
        assert_eq!(turns.len(), 7);
        for (i, turn) in turns.iter().enumerate() {
            assert_eq!(turn.content, format!("t{i}"));
        }
    }

    #[tokio::test]
    async fn cold_cache_loads_from_durable_store() {
        let dir = tempfile::tempdir().unwrap();

        {
            let history = ConversationHistory::new(FileHistoryStore::new(dir.path()));
            history.append("u1", Some("p1"), Role::User, "hello").await;
            history
                .append("u1", Some("p1"), Role::Assistant, "hi there")
                .await;
        }

        // Fresh cache over the same store.
        let history = ConversationHistory::new(FileHistoryStore::new(dir.path()));
        let turns = history.get("u1", Some("p1")).await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn clear_empties_cache_and_durable_record() {
        let dir = tempfile::tempdir().unwrap();
        let history = ConversationHistory::new(FileHistoryStore::new(dir.path()));

        history.append("u1", Some("p1"), Role::User, "hello").await;
        history.clear("u1", Some("p1")).await;

        assert!(history.get("u1", Some("p1")).await.is_empty());

        // Durable record still exists, just emptied.
        let store = FileHistoryStore::new(dir.path());
        let doc = store
            .load(&HistoryKey::new("u1", Some("p1")))
            .await
            .unwrap()
            .unwrap();
        assert!(doc.messages.is_empty());

        // A new append starts a log of length 1.
        history.append("u1", Some("p1"), Role::User, "again").await;
        assert_eq!(history.get("u1", Some("p1")).await.len(), 1);
    }

    #[tokio::test]
    async fn none_and_general_share_a_log() {
        let history = ConversationHistory::new(NoHistoryStore);
        history.append("u1", None, Role::User, "via none").await;

        let turns = history.get("u1", Some("general")).await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "via none");
    }

    #[tokio::test]
    async fn store_failures_degrade_to_memory_only() {
        let history = ConversationHistory::new(FailingStore);

        assert!(history.get("u1", None).await.is_empty());

        history.append("u1", None, Role::User, "still works").await;
        let turns = history.get("u1", None).await;
        assert_eq!(turns.len(), 1);

        assert!(history.sessions("u1").await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_are_linearized() {
        let history = Arc::new(ConversationHistory::new(NoHistoryStore));

        let mut handles = Vec::new();
        for i in 0..30 {
            let history = history.clone();
            handles.push(tokio::spawn(async move {
                history
                    .append("u1", Some("p1"), Role::User, &format!("c{i}"))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 30 racing appends, bound still holds and no turn is double-counted.
        let turns = history.get("u1", Some("p1")).await;
        assert_eq!(turns.len(), 20);
        let unique: std::collections::HashSet<&str> =
            turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(unique.len(), 20);
    }

    #[tokio::test]
    async fn append_sees_durable_history_before_trimming() {
        let dir = tempfile::tempdir().unwrap();

        {
            let history = ConversationHistory::new(FileHistoryStore::new(dir.path()));
            for i in 0..19 {
                history
                    .append("u1", Some("p1"), Role::User, &format!("old {i}"))
                    .await;
            }
        }

        // Cold cache: the first call is an append, not a get. The trim must
        // still be computed against the durable history.
        let history = ConversationHistory::new(FileHistoryStore::new(dir.path()));
        history.append("u1", Some("p1"), Role::User, "new 19").await;
        history.append("u1", Some("p1"), Role::User, "new 20").await;

        let turns = history.get("u1", Some("p1")).await;
        assert_eq!(turns.len(), 20);
        assert_eq!(turns[0].content, "old 1");
        assert_eq!(turns[19].content, "new 20");
    }
}
