//! semsearch Vector - Embedding generation and vector storage
//!
//! Turns product text into embeddings, stores them in a vector index
//! (Qdrant) and answers similarity queries against the product collection.
//!
//! ```text
//! text ──► EmbeddingGenerator ──► EmbeddingClient (Ollama / OpenAI)
//!                 │
//!                 ▼
//!        VectorStoreManager ──► VectorIndex (Qdrant)
//! ```

use async_trait::async_trait;
use semsearch_core::{
    BackendResult, CollectionInfo, CollectionSpec, IndexPoint, SearchRequest, SearchResult,
};

pub mod embedding;
pub mod generator;
pub mod manager;
pub mod qdrant_index;

pub use embedding::{create_embedding_client, EmbeddingClient, OllamaEmbedding, OpenAiEmbedding};
pub use generator::EmbeddingGenerator;
pub use manager::VectorStoreManager;
pub use qdrant_index::QdrantIndex;

/// Trait for vector index operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// List the names of all collections
    async fn list_collections(&self) -> BackendResult<Vec<String>>;

    /// Create a collection with the given shape
    async fn create_collection(&self, spec: &CollectionSpec) -> BackendResult<()>;

    /// Insert or overwrite points by identifier
    async fn upsert_points(&self, collection: &str, points: Vec<IndexPoint>) -> BackendResult<()>;

    /// Nearest-neighbour search, ordered by descending score
    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> BackendResult<Vec<SearchResult>>;

    /// Delete a collection and all its points
    async fn delete_collection(&self, collection: &str) -> BackendResult<()>;

    /// Fetch collection metadata
    async fn collection_info(&self, collection: &str) -> BackendResult<CollectionInfo>;
}
