use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;

use super::store::{ChatSessionSummary, HistoryDocument, HistoryError, HistoryStore};
use super::HistoryKey;
use crate::types::ConversationTurn;

/// Durable history as one JSON document per key on disk. Append is a
/// read-modify-write of the whole document, which matches the backing-store
/// semantics the cache is written against.
pub struct FileHistoryStore {
    dir: PathBuf,
}

impl FileHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &HistoryKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.doc_id()))
    }

    async fn read_document(&self, path: &PathBuf) -> Result<Option<HistoryDocument>, HistoryError> {
        match tokio::fs::read_to_string(path).await {
            Ok(json) => {
                let doc: HistoryDocument = serde_json::from_str(&json)
                    .map_err(|e| HistoryError::Serialization(e.to_string()))?;
                Ok(Some(doc))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HistoryError::Store(e.to_string())),
        }
    }

    async fn write_document(
        &self,
        path: &PathBuf,
        doc: &HistoryDocument,
    ) -> Result<(), HistoryError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| HistoryError::Store(e.to_string()))?;
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| HistoryError::Store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load(&self, key: &HistoryKey) -> Result<Option<HistoryDocument>, HistoryError> {
        self.read_document(&self.path(key)).await
    }

    async fn append(&self, key: &HistoryKey, turn: &ConversationTurn) -> Result<(), HistoryError> {
        let path = self.path(key);
        let now = Utc::now();

        let mut doc = match self.read_document(&path).await? {
            Some(doc) => doc,
            None => HistoryDocument {
                user_id: key.user_id().to_string(),
                project_id: key.project_id().to_string(),
                messages: Vec::new(),
                created_at: now,
                updated_at: now,
                last_message_at: None,
            },
        };

        doc.messages.push(turn.clone());
        doc.updated_at = now;
        doc.last_message_at = Some(turn.timestamp);

        self.write_document(&path, &doc).await
    }

    async fn clear(&self, key: &HistoryKey) -> Result<(), HistoryError> {
        let path = self.path(key);
        let Some(mut doc) = self.read_document(&path).await? else {
            return Ok(());
        };

        doc.messages.clear();
        doc.updated_at = Utc::now();
        self.write_document(&path, &doc).await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ChatSessionSummary>, HistoryError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HistoryError::Store(e.to_string())),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| HistoryError::Store(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(doc) = self.read_document(&path).await? else {
                continue;
            };
            if doc.user_id != user_id {
                continue;
            }
            summaries.push(ChatSessionSummary {
                project_id: doc.project_id,
                message_count: doc.messages.len(),
                last_message_at: doc.last_message_at,
                created_at: doc.created_at,
            });
        }

        summaries.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        Ok(summaries)
    }
}
