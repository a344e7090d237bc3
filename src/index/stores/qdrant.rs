use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PointStruct, SearchPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;

use crate::index::error::IndexError;
use crate::index::store::{SearchHit, VectorStore};
use crate::index::types::{EntryKind, EntryMetadata, IndexedEntry};

/// Qdrant-backed vector store. Vectors live server-side, entry metadata in
/// the point payload. Scope filtering is an exact keyword match on `team_id`.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimensions: usize,
}

impl QdrantVectorStore {
    /// Connect to a Qdrant instance and ensure the collection exists.
    pub async fn new(url: &str, collection: &str, dimensions: usize) -> Result<Self, IndexError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| IndexError::Store(format!("failed to connect to qdrant: {e}")))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimensions,
        };

        store.ensure_collection().await?;
        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), IndexError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| IndexError::Store(format!("failed to check collection: {e}")))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimensions as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| IndexError::Store(format!("failed to create collection: {e}")))?;
        }

        Ok(())
    }

    fn scope_filter(team_id: &str) -> Filter {
        Filter::must([Condition::matches("team_id", team_id.to_string())])
    }
}

/// Qdrant point ids must be integers or UUIDs; the logical entry id lives in
/// the payload and the point id is a stable hash of it, so re-ingesting the
/// same logical entity replaces its point.
fn point_id(entry_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    entry_id.hash(&mut hasher);
    hasher.finish()
}

fn entry_payload(entry: &IndexedEntry) -> Result<Payload, IndexError> {
    let (sender_id, project_name, language) = match &entry.metadata.kind {
        EntryKind::Text { sender_id } => (sender_id.as_str(), "", ""),
        EntryKind::ProjectInfo { project_name } => ("", project_name.as_str(), ""),
        EntryKind::CodeSnippet { language } => ("", "", language.as_str()),
    };

    json!({
        "entry_id": entry.id,
        "content": entry.content,
        "team_id": entry.metadata.team_id,
        "sender_name": entry.metadata.sender_name,
        "timestamp": entry.metadata.timestamp.to_rfc3339(),
        "message_type": entry.metadata.kind.label(),
        "sender_id": sender_id,
        "project_name": project_name,
        "language": language,
    })
    .try_into()
    .map_err(|e| IndexError::Serialization(format!("payload: {e}")))
}

fn entry_from_payload(
    payload: &std::collections::HashMap<String, QdrantValue>,
) -> Result<IndexedEntry, IndexError> {
    let kind = match extract_string(payload, "message_type").as_str() {
        "project_info" => EntryKind::ProjectInfo {
            project_name: extract_string(payload, "project_name"),
        },
        "code_snippet" => EntryKind::CodeSnippet {
            language: extract_string(payload, "language"),
        },
        _ => EntryKind::Text {
            sender_id: extract_string(payload, "sender_id"),
        },
    };

    let timestamp = chrono::DateTime::parse_from_rfc3339(&extract_string(payload, "timestamp"))
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| IndexError::Serialization(format!("timestamp: {e}")))?;

    Ok(IndexedEntry {
        id: extract_string(payload, "entry_id"),
        content: extract_string(payload, "content"),
        metadata: EntryMetadata {
            team_id: extract_string(payload, "team_id"),
            sender_name: extract_string(payload, "sender_name"),
            timestamp,
            kind,
        },
    })
}

fn extract_string(payload: &std::collections::HashMap<String, QdrantValue>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .cloned()
        .unwrap_or_default()
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, entries: Vec<(IndexedEntry, Vec<f32>)>) -> Result<(), IndexError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut points = Vec::with_capacity(entries.len());
        for (entry, embedding) in &entries {
            let payload = entry_payload(entry)?;
            points.push(PointStruct::new(
                point_id(&entry.id),
                embedding.clone(),
                payload,
            ));
        }

        self.client
            .upsert_points(
                qdrant_client::qdrant::UpsertPointsBuilder::new(&self.collection, points)
                    .wait(true),
            )
            .await
            .map_err(|e| IndexError::Store(format!("upsert failed: {e}")))?;

        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        team_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let mut builder =
            SearchPointsBuilder::new(&self.collection, query_embedding.to_vec(), limit as u64)
                .with_payload(true);

        if let Some(team) = team_id {
            builder = builder.filter(Self::scope_filter(team));
        }

        let results = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| IndexError::Store(format!("search failed: {e}")))?;

        let mut hits = Vec::with_capacity(results.result.len());
        for point in results.result {
            let entry = entry_from_payload(&point.payload)?;
            hits.push(SearchHit {
                entry,
                // Cosine similarity score back to a distance.
                distance: 1.0 - point.score,
            });
        }

        Ok(hits)
    }

    async fn purge_team(&self, team_id: &str) -> Result<usize, IndexError> {
        let counted = self
            .client
            .count(
                CountPointsBuilder::new(&self.collection)
                    .filter(Self::scope_filter(team_id))
                    .exact(true),
            )
            .await
            .map_err(|e| IndexError::Store(format!("count failed: {e}")))?;
        let removed = counted.result.map(|r| r.count as usize).unwrap_or(0);

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(Self::scope_filter(team_id))
                    .wait(true),
            )
            .await
            .map_err(|e| IndexError::Store(format!("delete failed: {e}")))?;

        Ok(removed)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let result = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| IndexError::Store(format!("count failed: {e}")))?;

        Ok(result.result.map(|r| r.count as usize).unwrap_or(0))
    }
}
