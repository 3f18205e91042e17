use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::fmt::Display;
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::models::{EmbeddingRecord, NewEmbedding, Resource, SearchResult};
use crate::database::search::{check_query_dimension, check_record_dimensions};
use crate::database::sqlite::queries::{EmbeddingQueries, MetadataQueries, ResourceQueries};
use crate::database::{EmbeddingStore, ResourceStore};
use crate::{Result, RetrievalError};

#[cfg(test)]
mod tests;

pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// Attach a message to a database failure, turning it into a storage error.
pub(crate) trait StorageContext<T> {
    fn storage_context(self, message: &str) -> Result<T>;
}

impl<T, E: Display> StorageContext<T> for std::result::Result<T, E> {
    #[inline]
    fn storage_context(self, message: &str) -> Result<T> {
        self.map_err(|e| RetrievalError::Storage(format!("{}: {}", message, e)))
    }
}

/// Knowledge base backed by a single SQLite file.
///
/// Implements both store traits over one pool so that deleting a resource
/// cascades to its embeddings inside the database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
    dimension: usize,
}

impl SqliteStore {
    /// Open (or create) the database at `path` for vectors of `dimension` values.
    pub async fn open<P: AsRef<Path>>(path: P, dimension: usize) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .storage_context("Failed to create database connection pool")?;

        Self::from_pool(pool, dimension).await
    }

    /// Private in-memory database. Every handle shares the one connection.
    pub async fn in_memory(dimension: usize) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .storage_context("Failed to open in-memory database")?;

        Self::from_pool(pool, dimension).await
    }

    /// Open `knowledge.db` under the configured base directory.
    pub async fn initialize_from_config(config: &Config) -> Result<Self> {
        let base_dir = config.get_base_dir();
        std::fs::create_dir_all(base_dir).map_err(|e| {
            RetrievalError::Storage(format!(
                "Failed to create data directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;

        let dimension = config.embedding.dimension as usize;
        Self::open(config.database_path(), dimension).await
    }

    async fn from_pool(pool: DbPool, dimension: usize) -> Result<Self> {
        let store = Self { pool, dimension };
        store.run_migrations().await?;
        MetadataQueries::ensure_dimension(&store.pool, dimension).await?;
        Ok(store)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .storage_context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    /// Delete every embedding and resource in one transaction.
    ///
    /// Returns `(embeddings, resources)` removed.
    pub async fn clear_all(&self) -> Result<(u64, u64)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .storage_context("Failed to begin transaction")?;

        let embeddings = sqlx::query("DELETE FROM embeddings")
            .execute(&mut *tx)
            .await
            .storage_context("Failed to delete embeddings")?
            .rows_affected();
        let resources = sqlx::query("DELETE FROM resources")
            .execute(&mut *tx)
            .await
            .storage_context("Failed to delete resources")?
            .rows_affected();

        tx.commit()
            .await
            .storage_context("Failed to commit clear")?;

        info!(
            "Cleared {} embeddings and {} resources",
            embeddings, resources
        );
        Ok((embeddings, resources))
    }

    /// Reclaim space after large deletions.
    pub async fn optimize(&self) -> Result<()> {
        info!("Optimizing database");

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .storage_context("Failed to vacuum database")?;

        sqlx::query("ANALYZE")
            .execute(&self.pool)
            .await
            .storage_context("Failed to analyze database")?;

        debug!("Database optimization completed");
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for SqliteStore {
    async fn insert(&self, resource: &Resource) -> Result<()> {
        Resource::validate_content(&resource.content)?;
        ResourceQueries::insert(&self.pool, resource).await?;
        debug!("Created resource {}", resource.id);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Resource> {
        ResourceQueries::get_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| RetrievalError::NotFound(format!("Resource {}", id)))
    }

    async fn list_all(&self) -> Result<Vec<Resource>> {
        ResourceQueries::list_all(&self.pool).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        ResourceQueries::delete(&self.pool, id).await?;
        debug!("Deleted resource {}", id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        ResourceQueries::delete_all(&self.pool).await
    }
}

#[async_trait]
impl EmbeddingStore for SqliteStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn insert_many(&self, records: Vec<NewEmbedding>) -> Result<Vec<EmbeddingRecord>> {
        check_record_dimensions(&records, self.dimension)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        EmbeddingQueries::insert_many(&self.pool, records).await
    }

    async fn search(
        &self,
        query: &[f32],
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        check_query_dimension(query, self.dimension)?;
        EmbeddingQueries::search(&self.pool, query, self.dimension, min_similarity, limit).await
    }

    async fn list_for_resource(&self, resource_id: &str) -> Result<Vec<EmbeddingRecord>> {
        EmbeddingQueries::list_for_resource(&self.pool, resource_id, self.dimension).await
    }

    async fn count(&self) -> Result<u64> {
        EmbeddingQueries::count(&self.pool).await
    }

    async fn delete_all(&self) -> Result<u64> {
        EmbeddingQueries::delete_all(&self.pool).await
    }
}
