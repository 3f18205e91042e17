// Database module
// Resource and embedding persistence behind two store traits, with a SQLite
// backend for real use and an in-memory backend for tests and scratch sessions

pub mod memory;
pub mod models;
pub mod search;
pub mod sqlite;

use async_trait::async_trait;

use crate::Result;

pub use memory::MemoryStore;
pub use models::{EmbeddingRecord, NewEmbedding, Resource, SearchResult};
pub use search::{SimilarityRanker, rank_by_similarity};
pub use sqlite::SqliteStore;

/// Durable home of original ingested text.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Persist a resource whose id the caller already chose.
    async fn insert(&self, resource: &Resource) -> Result<()>;

    /// Persist `content` under a fresh unique id.
    async fn create(&self, content: &str) -> Result<Resource> {
        let resource = Resource::new(content);
        self.insert(&resource).await?;
        Ok(resource)
    }

    /// Returns [`crate::RetrievalError::NotFound`] for an unknown id.
    async fn get(&self, id: &str) -> Result<Resource>;

    /// All resources, oldest first.
    async fn list_all(&self) -> Result<Vec<Resource>>;

    /// Delete one resource and every embedding derived from it.
    ///
    /// Returns [`crate::RetrievalError::NotFound`] for an unknown id.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Remove every resource. Returns how many were deleted.
    async fn delete_all(&self) -> Result<u64>;
}

/// Chunk vectors with exact cosine-similarity search.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Length every stored vector must have.
    fn dimension(&self) -> usize;

    /// Insert all records or none of them.
    ///
    /// Every record must reference an existing resource and carry a vector of
    /// [`EmbeddingStore::dimension`] values.
    async fn insert_many(&self, records: Vec<NewEmbedding>) -> Result<Vec<EmbeddingRecord>>;

    /// Chunks whose similarity to `query` is strictly above `min_similarity`,
    /// most similar first, at most `limit` of them.
    async fn search(
        &self,
        query: &[f32],
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Embeddings of one resource in chunk order.
    async fn list_for_resource(&self, resource_id: &str) -> Result<Vec<EmbeddingRecord>>;

    async fn count(&self) -> Result<u64>;

    /// Remove every embedding. Returns how many were deleted.
    async fn delete_all(&self) -> Result<u64>;
}
