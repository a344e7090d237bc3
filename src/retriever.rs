use std::sync::Arc;

use tracing::{debug, warn};

use crate::index::{RetrievedItem, SemanticIndex};

/// Over-fetch multiplier for knowledge search. The store can't filter on
/// scope AND kind in one query, so we fetch extra candidates and filter
/// client-side. A tunable heuristic: when fewer than k knowledge items sit
/// among the 2k nearest candidates, the result is short and we do not retry.
const KNOWLEDGE_OVERFETCH: usize = 2;

/// Read side of the semantic index. Retrieval is a best-effort enrichment:
/// any index failure degrades to an empty result list and is logged, never
/// propagated.
#[derive(Clone)]
pub struct ContextRetriever {
    index: Arc<SemanticIndex>,
}

impl ContextRetriever {
    pub fn new(index: Arc<SemanticIndex>) -> Self {
        Self { index }
    }

    /// Broad similarity search over everything in scope. No kind filter, so
    /// chat and knowledge entries may both surface. Passing `team_id = None`
    /// intentionally crosses scope boundaries and searches all teams.
    pub async fn search_messages(
        &self,
        query: &str,
        team_id: Option<&str>,
        k: usize,
    ) -> Vec<RetrievedItem> {
        match self.index.search(query, team_id, k).await {
            Ok(items) => {
                debug!(count = items.len(), ?team_id, "message search");
                items
            }
            Err(e) => {
                warn!(error = %e, "message search failed, returning no context");
                Vec::new()
            }
        }
    }

    /// Narrow search for project facts and code snippets. Over-fetches, then
    /// keeps only knowledge kinds and truncates to the k most relevant.
    pub async fn search_knowledge(
        &self,
        query: &str,
        team_id: Option<&str>,
        k: usize,
    ) -> Vec<RetrievedItem> {
        let candidates = match self
            .index
            .search(query, team_id, k * KNOWLEDGE_OVERFETCH)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "knowledge search failed, returning no context");
                return Vec::new();
            }
        };

        let mut items: Vec<RetrievedItem> = candidates
            .into_iter()
            .filter(|item| item.kind.is_knowledge())
            .collect();
        items.truncate(k);

        if items.len() < k {
            debug!(
                found = items.len(),
                requested = k,
                "knowledge search under-returned after kind filter"
            );
        }

        items
    }
}
