// Retrieval module
// Ingestion (resource, chunks, embeddings) and similarity queries over the knowledge base


use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::{Config, RetrievalConfig};
use crate::database::{
    EmbeddingRecord, EmbeddingStore, NewEmbedding, Resource, ResourceStore, SearchResult,
    SqliteStore,
};
use crate::embeddings::{Embedder, chunk_text, embedder_from_config};
use crate::{ErrorKind, Result, RetrievalError};

/// Rows must score strictly above this to be returned.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.1;
pub const DEFAULT_RESULT_LIMIT: usize = 10;

const PREVIEW_CHARS: usize = 200;

/// Tunables for [`RetrievalService`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
    pub similarity_threshold: f64,
    pub result_limit: usize,
    pub embedding_timeout: Duration,
    pub storage_timeout: Duration,
    pub rollback_on_failure: bool,
}

impl Default for RetrievalOptions {
    #[inline]
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for RetrievalOptions {
    #[inline]
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            result_limit: config.result_limit,
            embedding_timeout: config.embedding_timeout(),
            storage_timeout: config.storage_timeout(),
            rollback_on_failure: config.rollback_on_failure,
        }
    }
}

/// What a successful ingestion stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub resource_id: String,
    pub chunk_count: usize,
}

/// Rows removed by [`RetrievalService::clear_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOutcome {
    pub embeddings: u64,
    pub resources: u64,
}

/// Orchestrates the embedder and the two stores.
///
/// Ingestion runs create, chunk, embed and insert strictly in sequence. Every
/// provider and storage call is bounded by the configured timeouts.
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    resources: Arc<dyn ResourceStore>,
    embeddings: Arc<dyn EmbeddingStore>,
    options: RetrievalOptions,
}

impl RetrievalService {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        resources: Arc<dyn ResourceStore>,
        embeddings: Arc<dyn EmbeddingStore>,
        options: RetrievalOptions,
    ) -> Self {
        Self {
            embedder,
            resources,
            embeddings,
            options,
        }
    }

    /// Use one store for both resources and embeddings.
    #[inline]
    pub fn with_store<S>(embedder: Arc<dyn Embedder>, store: Arc<S>, options: RetrievalOptions) -> Self
    where
        S: ResourceStore + EmbeddingStore + 'static,
    {
        let resources: Arc<dyn ResourceStore> = Arc::<S>::clone(&store);
        let embeddings: Arc<dyn EmbeddingStore> = store;
        Self::new(embedder, resources, embeddings, options)
    }

    /// Configured embedder over the SQLite knowledge base in the config directory.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = embedder_from_config(&config.embedding)?;
        let store = Arc::new(SqliteStore::initialize_from_config(config).await?);
        Ok(Self::with_store(
            embedder,
            store,
            RetrievalOptions::from(&config.retrieval),
        ))
    }

    #[inline]
    pub fn options(&self) -> &RetrievalOptions {
        &self.options
    }

    /// Store `content` as a resource plus one embedding per chunk.
    ///
    /// Failures come back wrapped in [`RetrievalError::Ingest`]. When
    /// `rollback_on_failure` is set, a resource whose embeddings could not be
    /// stored is deleted again.
    pub async fn ingest(&self, content: &str) -> Result<IngestOutcome> {
        self.try_ingest(content).await.map_err(|e| {
            error!("Ingestion failed: {}", e);
            RetrievalError::Ingest(Box::new(e))
        })
    }

    async fn try_ingest(&self, content: &str) -> Result<IngestOutcome> {
        Resource::validate_content(content)?;
        let chunks = chunk_text(content);
        if chunks.is_empty() {
            return Err(RetrievalError::Validation(
                "Content produced no chunks".to_string(),
            ));
        }

        let resource = Resource::new(content);
        if let Err(e) = bounded(
            "create resource",
            self.options.storage_timeout,
            self.resources.insert(&resource),
        )
        .await
        {
            // A timed-out insert may still have landed.
            if e.kind() == ErrorKind::Timeout && self.options.rollback_on_failure {
                self.roll_back(&resource.id).await;
            }
            return Err(e);
        }
        info!(
            "Created resource {} ({} chars, {} chunks)",
            resource.id,
            content.len(),
            chunks.len()
        );

        match self.embed_and_store(&resource.id, chunks).await {
            Ok(chunk_count) => Ok(IngestOutcome {
                resource_id: resource.id,
                chunk_count,
            }),
            Err(e) => {
                if self.options.rollback_on_failure {
                    self.roll_back(&resource.id).await;
                } else {
                    warn!("Resource {} left without embeddings", resource.id);
                }
                Err(e)
            }
        }
    }

    async fn embed_and_store(&self, resource_id: &str, chunks: Vec<String>) -> Result<usize> {
        let vectors = bounded(
            "embed chunks",
            self.options.embedding_timeout,
            self.embedder.embed_many(&chunks),
        )
        .await?;

        if vectors.len() != chunks.len() {
            return Err(RetrievalError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let records: Vec<NewEmbedding> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(chunk_index, (content, embedding))| NewEmbedding {
                resource_id: resource_id.to_string(),
                chunk_index,
                content,
                embedding,
            })
            .collect();

        let inserted = bounded(
            "insert embeddings",
            self.options.storage_timeout,
            self.embeddings.insert_many(records),
        )
        .await?;

        debug!(
            "Stored {} embeddings for resource {}",
            inserted.len(),
            resource_id
        );
        Ok(inserted.len())
    }

    async fn roll_back(&self, resource_id: &str) {
        match bounded(
            "delete resource",
            self.options.storage_timeout,
            self.resources.delete(resource_id),
        )
        .await
        {
            Ok(()) => warn!("Rolled back resource {}", resource_id),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Resource {} was never stored", resource_id);
            }
            Err(e) => error!("Failed to roll back resource {}: {}", resource_id, e),
        }
    }

    /// Chunks most similar to `question`, best first.
    ///
    /// An empty knowledge base (or nothing above the threshold) yields an empty list.
    pub async fn query(&self, question: &str) -> Result<Vec<SearchResult>> {
        if question.trim().is_empty() {
            return Err(RetrievalError::Validation(
                "Query cannot be empty".to_string(),
            ));
        }

        info!(
            "Searching knowledge base ({} chars): {}",
            question.len(),
            preview(question)
        );

        let vector = bounded(
            "embed query",
            self.options.embedding_timeout,
            self.embedder.embed_one(question),
        )
        .await?;
        debug!("Query embedding has {} dimensions", vector.dimension());

        let results = bounded(
            "search embeddings",
            self.options.storage_timeout,
            self.embeddings.search(
                vector.as_slice(),
                self.options.similarity_threshold,
                self.options.result_limit,
            ),
        )
        .await?;

        match results.first() {
            Some(top) => info!(
                "Found {} results, top similarity {:.4}",
                results.len(),
                top.similarity
            ),
            None => info!("No content above similarity {}", self.options.similarity_threshold),
        }
        Ok(results)
    }

    /// Remove all embeddings, then all resources.
    pub async fn clear_all(&self) -> Result<ClearOutcome> {
        let embeddings = bounded(
            "delete embeddings",
            self.options.storage_timeout,
            self.embeddings.delete_all(),
        )
        .await?;
        let resources = bounded(
            "delete resources",
            self.options.storage_timeout,
            self.resources.delete_all(),
        )
        .await?;

        info!(
            "Cleared knowledge base: {} embeddings, {} resources",
            embeddings, resources
        );
        Ok(ClearOutcome {
            embeddings,
            resources,
        })
    }

    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        bounded(
            "list resources",
            self.options.storage_timeout,
            self.resources.list_all(),
        )
        .await
    }

    pub async fn resource_chunks(&self, resource_id: &str) -> Result<Vec<EmbeddingRecord>> {
        bounded(
            "list embeddings",
            self.options.storage_timeout,
            self.embeddings.list_for_resource(resource_id),
        )
        .await
    }

    pub async fn embedding_count(&self) -> Result<u64> {
        bounded(
            "count embeddings",
            self.options.storage_timeout,
            self.embeddings.count(),
        )
        .await
    }
}

async fn bounded<T, F>(operation: &'static str, after: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(after, call).await.map_err(|_| {
        warn!("{} timed out after {:?}", operation, after);
        RetrievalError::Timeout { operation, after }
    })?
}

/// First characters of `text` for log lines.
fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let mut head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        head.push_str("...");
    }
    head
}

/// Join search results into grounding text for a prompt, one numbered line each.
#[inline]
pub fn format_context(results: &[SearchResult]) -> String {
    let mut context = String::new();
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            context.push('\n');
        }
        let _ = write!(context, "{}. {}", i + 1, result.content.trim());
    }
    context
}
