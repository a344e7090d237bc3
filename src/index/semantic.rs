use tracing::{debug, info};

use super::embedding::EmbeddingProvider;
use super::error::IndexError;
use super::store::VectorStore;
use super::types::{ChatRecord, EntryKind, EntryMetadata, IndexedEntry, RetrievedItem};

/// Wires a vector store to an embedding provider. One collection holds chat
/// messages, project facts, and code snippets; queries narrow by metadata.
pub struct SemanticIndex {
    store: Box<dyn VectorStore>,
    embedder: Box<dyn EmbeddingProvider>,
}

impl SemanticIndex {
    pub fn new(
        store: impl VectorStore + 'static,
        embedder: impl EmbeddingProvider + 'static,
    ) -> Self {
        Self {
            store: Box::new(store),
            embedder: Box::new(embedder),
        }
    }

    /// Upsert a single entry. Re-ingesting the same id replaces the stored
    /// embedding and metadata, so ingestion is idempotent.
    pub async fn ingest(&self, entry: IndexedEntry) -> Result<(), IndexError> {
        let embedding = self.embedder.embed(&entry.content).await?;
        let id = entry.id.clone();
        let kind = entry.metadata.kind.label();
        self.store.upsert(vec![(entry, embedding)]).await?;
        debug!(id = %id, kind, "ingested index entry");
        Ok(())
    }

    /// Batch-ingest chat feed records. Only `text` records with non-empty
    /// content are embedded; everything else is dropped here, and callers
    /// ingesting knowledge must use the single-entry path. Returns the
    /// number of entries written.
    pub async fn ingest_batch(&self, records: Vec<ChatRecord>) -> Result<usize, IndexError> {
        let entries: Vec<IndexedEntry> = records
            .into_iter()
            .filter(|r| r.message_type == "text" && !r.content.is_empty())
            .map(|r| IndexedEntry {
                id: r.message_id,
                content: r.content,
                metadata: EntryMetadata {
                    team_id: r.team_id,
                    sender_name: r.sender_name,
                    timestamp: r.timestamp,
                    kind: EntryKind::Text {
                        sender_id: r.sender_id,
                    },
                },
            })
            .collect();

        if entries.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = entries.iter().map(|e| e.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let count = entries.len();
        self.store
            .upsert(entries.into_iter().zip(embeddings).collect())
            .await?;

        info!(count, "batch-ingested chat messages");
        Ok(count)
    }

    /// Similarity query. `team_id = Some(t)` restricts to that scope;
    /// `None` deliberately searches across all teams. Results come back
    /// nearest first with relevance clamped into [0, 1].
    pub async fn search(
        &self,
        query: &str,
        team_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RetrievedItem>, IndexError> {
        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.store.search(&query_embedding, team_id, limit).await?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedItem {
                content: hit.entry.content,
                kind: hit.entry.metadata.kind,
                sender_name: hit.entry.metadata.sender_name,
                timestamp: hit.entry.metadata.timestamp,
                relevance: (1.0 - hit.distance).clamp(0.0, 1.0),
                team_id: hit.entry.metadata.team_id,
            })
            .collect())
    }

    /// Delete every entry in a team's scope. Returns how many were removed.
    pub async fn purge_team(&self, team_id: &str) -> Result<usize, IndexError> {
        let removed = self.store.purge_team(team_id).await?;
        info!(team_id, removed, "purged team entries");
        Ok(removed)
    }

    /// Total entries across all scopes and kinds.
    pub async fn count(&self) -> Result<usize, IndexError> {
        self.store.count().await
    }
}
