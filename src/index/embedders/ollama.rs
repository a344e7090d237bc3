use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::index::embedding::EmbeddingProvider;
use crate::index::error::IndexError;

/// Inputs per request when embedding an ingestion batch. Chat-feed batches
/// can run to thousands of messages; splitting keeps request bodies bounded.
const MAX_BATCH: usize = 64;

/// Embedding backend over a local Ollama instance. Ingestion batches are
/// split into chunks of `MAX_BATCH` inputs, and every returned vector is
/// checked against the configured width, since the store's collection is
/// created with a fixed dimensionality.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// `dimensions` must match what the model emits, e.g. 768 for
    /// `nomic-embed-text`.
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://localhost:11434".into(),
            model: model.into(),
            dimensions,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn request_embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": inputs,
        });

        let resp = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Embedding(format!("embedding request failed: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexError::Embedding(format!(
                "embedding backend returned {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| IndexError::Embedding(format!("bad embedding response: {e}")))?;

        check_vectors(&parsed.embeddings, inputs.len(), self.dimensions)?;
        Ok(parsed.embeddings)
    }
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// A response with the wrong vector count or width would corrupt the index
/// on upsert, so both are hard errors.
fn check_vectors(
    vectors: &[Vec<f32>],
    expected_count: usize,
    expected_dims: usize,
) -> Result<(), IndexError> {
    if vectors.len() != expected_count {
        return Err(IndexError::Embedding(format!(
            "asked for {expected_count} embeddings, backend sent {}",
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected_dims) {
        return Err(IndexError::Embedding(format!(
            "embedding width {} does not match configured {expected_dims}",
            bad.len()
        )));
    }
    Ok(())
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let mut vectors = self.request_embeddings(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| IndexError::Embedding("backend sent no embedding".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            all.extend(self.request_embeddings(chunk).await?);
        }
        debug!(count = all.len(), "embedded ingestion batch");
        Ok(all)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
