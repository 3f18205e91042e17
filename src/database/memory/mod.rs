
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::database::models::{EmbeddingRecord, NewEmbedding, Resource, SearchResult};
use crate::database::search::{check_query_dimension, check_record_dimensions, rank_by_similarity};
use crate::database::{EmbeddingStore, ResourceStore};
use crate::{Result, RetrievalError};

#[derive(Debug, Default)]
struct MemoryState {
    resources: Vec<Resource>,
    embeddings: Vec<EmbeddingRecord>,
}

/// Process-local store implementing both store traits.
///
/// Rows live in insertion order, so listing and tie-breaking behave like the
/// SQLite store. Nothing survives the process.
#[derive(Debug)]
pub struct MemoryStore {
    dimension: usize,
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(MemoryState::default()),
        }
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn insert(&self, resource: &Resource) -> Result<()> {
        Resource::validate_content(&resource.content)?;

        let mut state = self.state.write().await;
        if state.resources.iter().any(|r| r.id == resource.id) {
            return Err(RetrievalError::Storage(format!(
                "Resource {} already exists",
                resource.id
            )));
        }
        state.resources.push(resource.clone());
        debug!("Created resource {}", resource.id);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Resource> {
        let state = self.state.read().await;
        state
            .resources
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| RetrievalError::NotFound(format!("Resource {}", id)))
    }

    async fn list_all(&self) -> Result<Vec<Resource>> {
        Ok(self.state.read().await.resources.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.resources.len();
        state.resources.retain(|r| r.id != id);
        if state.resources.len() == before {
            return Err(RetrievalError::NotFound(format!("Resource {}", id)));
        }
        state.embeddings.retain(|e| e.resource_id != id);
        debug!("Deleted resource {}", id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        let removed = state.resources.len() as u64;
        state.resources.clear();
        state.embeddings.clear();
        Ok(removed)
    }
}

#[async_trait]
impl EmbeddingStore for MemoryStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn insert_many(&self, records: Vec<NewEmbedding>) -> Result<Vec<EmbeddingRecord>> {
        check_record_dimensions(&records, self.dimension)?;

        let mut state = self.state.write().await;
        if let Some(orphan) = records
            .iter()
            .find(|record| !state.resources.iter().any(|r| r.id == record.resource_id))
        {
            return Err(RetrievalError::Storage(format!(
                "Embedding references unknown resource {}",
                orphan.resource_id
            )));
        }

        let inserted: Vec<EmbeddingRecord> = records
            .into_iter()
            .map(|record| EmbeddingRecord {
                id: Uuid::new_v4().to_string(),
                resource_id: record.resource_id,
                chunk_index: record.chunk_index,
                content: record.content,
                embedding: record.embedding,
            })
            .collect();

        state.embeddings.extend(inserted.iter().cloned());
        debug!("Inserted {} embeddings", inserted.len());
        Ok(inserted)
    }

    async fn search(
        &self,
        query: &[f32],
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        check_query_dimension(query, self.dimension)?;

        let state = self.state.read().await;
        Ok(rank_by_similarity(
            state
                .embeddings
                .iter()
                .map(|e| (e.content.as_str(), e.embedding.as_slice())),
            query,
            min_similarity,
            limit,
        ))
    }

    async fn list_for_resource(&self, resource_id: &str) -> Result<Vec<EmbeddingRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<EmbeddingRecord> = state
            .embeddings
            .iter()
            .filter(|e| e.resource_id == resource_id)
            .cloned()
            .collect();
        records.sort_by_key(|e| e.chunk_index);
        Ok(records)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.state.read().await.embeddings.len() as u64)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        let removed = state.embeddings.len() as u64;
        state.embeddings.clear();
        Ok(removed)
    }
}
