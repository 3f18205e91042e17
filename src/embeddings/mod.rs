// Embeddings module
// Text chunking, the embedding provider boundary, and the vector type

pub mod chunking;
pub mod cohere;
pub mod http;
pub mod ollama;
pub mod vector;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::{Result, RetrievalError};

pub use chunking::chunk_text;
pub use cohere::CohereClient;
pub use http::{CallerGuard, CancelSignal};
pub use ollama::OllamaClient;
pub use vector::{Embedding, cosine_similarity};

/// Turns text into fixed-length vectors with one model identity.
///
/// Batch and single calls must use the same model and settings so that every
/// vector they produce is comparable under cosine similarity.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the model producing the vectors.
    fn model(&self) -> &str;

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Embed many texts. The result has one vector per input, in input order.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Embedding>;
}

/// Build the embedder selected by the configuration.
#[inline]
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    Ok(match config.provider {
        EmbeddingProvider::Cohere => Arc::new(CohereClient::new(config)?),
        EmbeddingProvider::Ollama => Arc::new(OllamaClient::new(config)?),
    })
}

/// Validate a provider response against the request it answers.
pub(crate) fn validate_batch(
    raw: Vec<Vec<f32>>,
    expected_count: usize,
    dimension: usize,
) -> Result<Vec<Embedding>> {
    if raw.len() != expected_count {
        return Err(RetrievalError::Embedding(format!(
            "Mismatch between request and response counts: {} vs {}",
            expected_count,
            raw.len()
        )));
    }

    raw.into_iter()
        .map(|values| Embedding::try_new(values, dimension))
        .collect()
}

/// Run a blocking provider call on the blocking thread pool.
///
/// The task is cancelled between HTTP attempts once this future is dropped.
pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CancelSignal) -> Result<T> + Send + 'static,
{
    let (_caller, cancel) = CancelSignal::pair();
    tokio::task::spawn_blocking(move || task(&cancel))
        .await
        .map_err(|e| RetrievalError::Embedding(format!("Embedding task failed: {}", e)))?
}
