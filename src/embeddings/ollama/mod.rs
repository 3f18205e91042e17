
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::http::{CancelSignal, HttpTransport, endpoint};
use super::{Embedder, Embedding, run_blocking, validate_batch};
use crate::config::EmbeddingConfig;
use crate::{Result, RetrievalError};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text:latest";
pub const DEFAULT_OLLAMA_DIMENSION: u32 = 768;

/// Client for a local Ollama server's embed API.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    dimension: usize,
    batch_size: usize,
    transport: HttpTransport,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url()?,
            model: config.model.clone(),
            dimension: config.dimension as usize,
            batch_size: config.batch_size.max(1) as usize,
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

    /// Check that the server answers and has the configured model pulled.
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models()?;

        if models.iter().any(|m| m.name == self.model) {
            info!(
                "Health check passed for Ollama server at {} with model {}",
                self.base_url, self.model
            );
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available_models
            );
            Err(RetrievalError::Embedding(format!(
                "Model '{}' is not available. Available models: {:?}",
                self.model, available_models
            )))
        }
    }

    /// List all models the server has pulled.
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = endpoint(&self.base_url, "/api/tags")?;
        debug!("Fetching available models from {}", url);

        let response_text = self.transport.get(&url)?;
        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| RetrievalError::Embedding(format!("Failed to parse models response: {}", e)))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Embed texts on the current thread, one request per batch.
    #[inline]
    pub fn embed_texts_blocking(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.embed_texts(texts, &CancelSignal::never())
    }

    fn embed_texts(&self, texts: &[String], cancel: &CancelSignal) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating Ollama embeddings for {} texts", texts.len());

        let url = endpoint(&self.base_url, "/api/embed")?;
        let mut results = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let request = EmbedRequest {
                model: &self.model,
                input: batch,
            };
            let response_text = self.transport.post_json(&url, None, &request, cancel)?;
            let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
                RetrievalError::Embedding(format!("Failed to parse embedding response: {}", e))
            })?;

            results.extend(validate_batch(
                response.embeddings,
                batch.len(),
                self.dimension,
            )?);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
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
        embeddings
            .pop()
            .ok_or_else(|| RetrievalError::Embedding("Provider returned no embedding".to_string()))
    }
}
