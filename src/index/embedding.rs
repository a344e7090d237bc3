use async_trait::async_trait;

use super::error::IndexError;

/// Turns entry content and queries into the fixed-width vectors the store
/// holds. Ingestion and search must go through the same provider, or
/// distances stop meaning anything.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one piece of text, typically a search query.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;

    /// Embed many texts, typically an ingestion batch. Defaults to one
    /// `embed` call per text; backends with native batching override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Vector width this provider produces. Must match the width the store's
    /// collection was created with.
    fn dimensions(&self) -> usize;
}
