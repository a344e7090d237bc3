#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("store error: {0}")]
    Store(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}
