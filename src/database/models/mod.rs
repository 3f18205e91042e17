use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::embeddings::Embedding;
use crate::{Result, RetrievalError};

/// A unit of original ingested text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: String,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Resource {
    /// A not yet stored resource with a fresh id.
    #[inline]
    pub fn new(content: &str) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Content must contain something other than whitespace.
    #[inline]
    pub fn validate_content(content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(RetrievalError::Validation(
                "Resource content cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A chunk embedding waiting to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmbedding {
    pub resource_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub embedding: Embedding,
}

/// A stored chunk embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub resource_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub embedding: Embedding,
}

/// A chunk ranked by similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f64,
}
