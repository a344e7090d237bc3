use async_trait::async_trait;

use super::error::IndexError;
use super::types::IndexedEntry;

/// One search candidate as the store returns it. Distance is in the store's
/// native metric (cosine distance for the provided stores); the index layer
/// converts it to a clamped relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entry: IndexedEntry,
    pub distance: f32,
}

/// Vector storage seam. One collection holds every entry kind; scope
/// filtering happens here via the `team_id` metadata, not via separate
/// collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upsert entries with their precomputed embeddings, keyed by entry id.
    /// Re-upserting an id replaces its embedding and metadata.
    async fn upsert(&self, entries: Vec<(IndexedEntry, Vec<f32>)>) -> Result<(), IndexError>;

    /// Similarity search, nearest first. `team_id = Some(t)` applies an
    /// exact-match scope filter; `None` searches across all scopes.
    async fn search(
        &self,
        query_embedding: &[f32],
        team_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, IndexError>;

    /// Delete every entry whose scope matches `team_id`. Returns how many
    /// entries were removed.
    async fn purge_team(&self, team_id: &str) -> Result<usize, IndexError>;

    /// Total number of entries in the collection.
    async fn count(&self) -> Result<usize, IndexError>;
}
