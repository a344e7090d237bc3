use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::index::error::IndexError;
use crate::index::store::{SearchHit, VectorStore};
use crate::index::types::IndexedEntry;

/// In-process vector store over a single map. Cosine distance, deterministic
/// ordering (distance ascending, id as tiebreak), so the same index state
/// always yields the same ranking. The test and single-node path.
#[derive(Default)]
pub struct MemoryVectorStore {
    entries: RwLock<HashMap<String, (IndexedEntry, Vec<f32>)>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, entries: Vec<(IndexedEntry, Vec<f32>)>) -> Result<(), IndexError> {
        let mut map = self.entries.write().await;
        for (entry, embedding) in entries {
            map.insert(entry.id.clone(), (entry, embedding));
        }
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        team_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let map = self.entries.read().await;

        let mut hits: Vec<SearchHit> = map
            .values()
            .filter(|(entry, _)| match team_id {
                Some(t) => entry.metadata.team_id == t,
                None => true,
            })
            .map(|(entry, embedding)| SearchHit {
                entry: entry.clone(),
                distance: cosine_distance(query_embedding, embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        hits.truncate(limit);

        Ok(hits)
    }

    async fn purge_team(&self, team_id: &str) -> Result<usize, IndexError> {
        let mut map = self.entries.write().await;
        let before = map.len();
        map.retain(|_, (entry, _)| entry.metadata.team_id != team_id);
        Ok(before - map.len())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.entries.read().await.len())
    }
}
