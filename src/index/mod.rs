pub mod embedders;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod semantic;
pub mod store;
pub mod stores;
pub mod types;

pub use embedders::ollama::OllamaEmbedder;
pub use embedding::EmbeddingProvider;
pub use error::IndexError;
pub use knowledge::{CodeSnippet, ProjectFact};
pub use semantic::SemanticIndex;
pub use store::{SearchHit, VectorStore};
pub use stores::memory::MemoryVectorStore;
#[cfg(feature = "qdrant")]
pub use stores::qdrant::QdrantVectorStore;
pub use types::{
    ChatRecord, EntryKind, EntryMetadata, IndexedEntry, RetrievedItem, GENERAL_SCOPE,
};
