
use futures::TryStreamExt;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use super::StorageContext;
use crate::database::models::{EmbeddingRecord, NewEmbedding, Resource, SearchResult};
use crate::database::search::SimilarityRanker;
use crate::embeddings::Embedding;
use crate::{Result, RetrievalError};

const DIMENSION_KEY: &str = "embedding_dimension";

pub struct ResourceQueries;

impl ResourceQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, content: &str) -> Result<Resource> {
        let resource = Resource::new(content);
        Self::insert(pool, &resource).await?;
        Ok(resource)
    }

    #[inline]
    pub async fn insert(pool: &SqlitePool, resource: &Resource) -> Result<()> {
        sqlx::query(
            "INSERT INTO resources (id, content, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&resource.id)
        .bind(&resource.content)
        .bind(resource.created_at)
        .bind(resource.updated_at)
        .execute(pool)
        .await
        .storage_context("Failed to create resource")?;

        Ok(())
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Resource>> {
        sqlx::query_as::<_, Resource>(
            r#"
            SELECT id, content, created_at, updated_at
            FROM resources WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .storage_context("Failed to get resource by id")
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Resource>> {
        sqlx::query_as::<_, Resource>(
            r#"
            SELECT id, content, created_at, updated_at
            FROM resources ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .storage_context("Failed to list resources")
    }

    /// Embeddings of the resource go with it through `ON DELETE CASCADE`.
    #[inline]
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
        let affected = sqlx::query("DELETE FROM resources WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .storage_context("Failed to delete resource")?
            .rows_affected();

        if affected == 0 {
            return Err(RetrievalError::NotFound(format!("Resource {}", id)));
        }
        Ok(())
    }

    #[inline]
    pub async fn delete_all(pool: &SqlitePool) -> Result<u64> {
        let affected = sqlx::query("DELETE FROM resources")
            .execute(pool)
            .await
            .storage_context("Failed to delete resources")?
            .rows_affected();
        Ok(affected)
    }
}

#[derive(Debug, FromRow)]
struct EmbeddingRow {
    id: String,
    resource_id: String,
    chunk_index: i64,
    content: String,
    embedding: Vec<u8>,
}

impl EmbeddingRow {
    fn into_record(self, dimension: usize) -> Result<EmbeddingRecord> {
        let chunk_index = usize::try_from(self.chunk_index).map_err(|_| {
            RetrievalError::Storage(format!(
                "Embedding {} has invalid chunk index {}",
                self.id, self.chunk_index
            ))
        })?;

        Ok(EmbeddingRecord {
            embedding: Embedding::from_bytes(&self.embedding, dimension)?,
            id: self.id,
            resource_id: self.resource_id,
            chunk_index,
            content: self.content,
        })
    }
}

pub struct EmbeddingQueries;

impl EmbeddingQueries {
    /// Insert every record inside one transaction.
    #[inline]
    pub async fn insert_many(
        pool: &SqlitePool,
        records: Vec<NewEmbedding>,
    ) -> Result<Vec<EmbeddingRecord>> {
        let mut tx = pool
            .begin()
            .await
            .storage_context("Failed to begin transaction")?;

        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            let id = Uuid::new_v4().to_string();
            let chunk_index = i64::try_from(record.chunk_index).map_err(|_| {
                RetrievalError::Storage(format!("Chunk index {} is too large", record.chunk_index))
            })?;

            sqlx::query(
                r#"
                INSERT INTO embeddings (id, resource_id, chunk_index, content, embedding)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&record.resource_id)
            .bind(chunk_index)
            .bind(&record.content)
            .bind(record.embedding.to_bytes())
            .execute(&mut *tx)
            .await
            .storage_context("Failed to insert embedding")?;

            inserted.push(EmbeddingRecord {
                id,
                resource_id: record.resource_id,
                chunk_index: record.chunk_index,
                content: record.content,
                embedding: record.embedding,
            });
        }

        tx.commit()
            .await
            .storage_context("Failed to commit embeddings")?;

        debug!("Inserted {} embeddings", inserted.len());
        Ok(inserted)
    }

    /// Stream every stored vector through the ranker in insertion order.
    #[inline]
    pub async fn search(
        pool: &SqlitePool,
        query: &[f32],
        dimension: usize,
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let mut ranker = SimilarityRanker::new(query, min_similarity, limit);
        let mut rows = sqlx::query_as::<_, (String, Vec<u8>)>(
            "SELECT content, embedding FROM embeddings ORDER BY rowid ASC",
        )
        .fetch(pool);

        while let Some((content, blob)) = rows
            .try_next()
            .await
            .storage_context("Failed to scan embeddings")?
        {
            let vector = Embedding::from_bytes(&blob, dimension)?;
            ranker.offer(&content, vector.as_slice());
        }

        debug!("Scanned {} embeddings", ranker.scanned());
        Ok(ranker.finish())
    }

    #[inline]
    pub async fn list_for_resource(
        pool: &SqlitePool,
        resource_id: &str,
        dimension: usize,
    ) -> Result<Vec<EmbeddingRecord>> {
        let rows = sqlx::query_as::<_, EmbeddingRow>(
            r#"
            SELECT id, resource_id, chunk_index, content, embedding
            FROM embeddings WHERE resource_id = ? ORDER BY chunk_index ASC
            "#,
        )
        .bind(resource_id)
        .fetch_all(pool)
        .await
        .storage_context("Failed to list embeddings for resource")?;

        rows.into_iter()
            .map(|row| row.into_record(dimension))
            .collect()
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
            .fetch_one(pool)
            .await
            .storage_context("Failed to count embeddings")?;
        Ok(count.unsigned_abs())
    }

    #[inline]
    pub async fn delete_all(pool: &SqlitePool) -> Result<u64> {
        let affected = sqlx::query("DELETE FROM embeddings")
            .execute(pool)
            .await
            .storage_context("Failed to delete embeddings")?
            .rows_affected();
        Ok(affected)
    }
}

pub struct MetadataQueries;

impl MetadataQueries {
    #[inline]
    pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM store_metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await
            .storage_context("Failed to read store metadata")
    }

    #[inline]
    pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO store_metadata (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await
        .storage_context("Failed to write store metadata")?;
        Ok(())
    }

    /// Record the vector dimension on first use and refuse a different one later.
    #[inline]
    pub async fn ensure_dimension(pool: &SqlitePool, dimension: usize) -> Result<()> {
        match Self::get(pool, DIMENSION_KEY).await? {
            None => Self::set(pool, DIMENSION_KEY, &dimension.to_string()).await,
            Some(stored) => {
                let stored: usize = stored.parse().map_err(|_| {
                    RetrievalError::Storage(format!("Stored dimension {:?} is not a number", stored))
                })?;
                if stored != dimension && EmbeddingQueries::count(pool).await? == 0 {
                    debug!("Empty knowledge base, switching dimension {} -> {}", stored, dimension);
                    return Self::set(pool, DIMENSION_KEY, &dimension.to_string()).await;
                }
                if stored != dimension {
                    warn!(
                        "Knowledge base holds {}-dimensional vectors, embedder produces {}",
                        stored, dimension
                    );
                    return Err(RetrievalError::Storage(format!(
                        "Knowledge base was created with {}-dimensional embeddings, but {} were requested; switch back to the original model or remove the database file",
                        stored, dimension
                    )));
                }
                Ok(())
            }
        }
    }
}
