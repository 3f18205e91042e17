
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::http::{CancelSignal, HttpTransport, endpoint};
use super::{Embedder, Embedding, run_blocking, validate_batch};
use crate::config::EmbeddingConfig;
use crate::{Result, RetrievalError};

pub const DEFAULT_COHERE_BASE_URL: &str = "https://api.cohere.com";
pub const DEFAULT_COHERE_MODEL: &str = "embed-english-v3.0";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1024;
pub const DEFAULT_INPUT_TYPE: &str = "search_query";
/// Largest number of texts Cohere accepts in one embed call.
pub const COHERE_MAX_BATCH_SIZE: u32 = 96;

const EMBED_PATH: &str = "/v2/embed";

/// Client for the Cohere v2 embed API.
#[derive(Debug, Clone)]
pub struct CohereClient {
    base_url: Url,
    model: String,
    dimension: usize,
    batch_size: usize,
    input_type: String,
    api_key: String,
    transport: HttpTransport,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'a str,
    embedding_types: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: EmbeddingsByType,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsByType {
    float: Vec<Vec<f32>>,
}

impl CohereClient {
    /// Build a client, reading the API key from the configured environment variable.
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::with_api_key(config, api_key)
    }

    #[inline]
    pub fn with_api_key(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url()?,
            model: config.model.clone(),
            dimension: config.dimension as usize,
            batch_size: config.batch_size.clamp(1, COHERE_MAX_BATCH_SIZE) as usize,
            input_type: config.input_type.clone(),
            api_key: api_key.into(),
            transport: HttpTransport::new(config.timeout(), config.retry_attempts),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_timeout(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.transport = self.transport.with_retry_attempts(attempts);
        self
    }

    #[inline]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.transport = self.transport.with_backoff_base(base);
        self
    }

    /// Embed texts on the current thread, splitting into provider-sized requests.
    #[inline]
    pub fn embed_texts_blocking(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.embed_texts(texts, &CancelSignal::never())
    }

    fn embed_texts(&self, texts: &[String], cancel: &CancelSignal) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Generating Cohere embeddings for {} texts with {}",
            texts.len(),
            self.model
        );

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            results.extend(self.embed_single_batch(batch, cancel)?);
        }

        info!(
            "Generated {} embeddings with {} dimensions",
            results.len(),
            self.dimension
        );
        Ok(results)
    }

    fn embed_single_batch(&self, texts: &[String], cancel: &CancelSignal) -> Result<Vec<Embedding>> {
        let url = endpoint(&self.base_url, EMBED_PATH)?;
        let request = EmbedRequest {
            model: &self.model,
            texts,
            input_type: &self.input_type,
            embedding_types: ["float"],
        };

        let response_text = self
            .transport
            .post_json(&url, Some(&self.api_key), &request, cancel)?;

        let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            RetrievalError::Embedding(format!("Failed to parse Cohere response: {}", e))
        })?;

        validate_batch(response.embeddings.float, texts.len(), self.dimension)
    }
}

#[async_trait]
impl Embedder for CohereClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.clone();
        let texts = texts.to_vec();
        run_blocking(move |cancel| client.embed_texts(&texts, cancel)).await
    }

    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed_many(&[text.to_string()]).await?;
        embeddings.pop().ok_or_else(|| {
            RetrievalError::Embedding("Provider returned no embedding".to_string())
        })
    }
}
