//! Exact similarity ranking shared by the stores.
//!
//! Every stored vector is compared with the query (a full O(N·D) scan). Rows
//! whose similarity is not strictly above the threshold are dropped, the rest
//! are ordered by similarity descending, and the first `limit` are kept.
//! Equal similarities keep the order in which the candidates were supplied,
//! which both stores make insertion order.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;

use crate::database::models::{NewEmbedding, SearchResult};
use crate::embeddings::cosine_similarity;
use crate::{Result, RetrievalError};

/// Accumulates scored candidates during a scan.
#[derive(Debug)]
pub struct SimilarityRanker<'q> {
    query: &'q [f32],
    min_similarity: f64,
    limit: usize,
    matches: Vec<SearchResult>,
    scanned: usize,
}

impl<'q> SimilarityRanker<'q> {
    #[inline]
    pub fn new(query: &'q [f32], min_similarity: f64, limit: usize) -> Self {
        Self {
            query,
            min_similarity,
            limit,
            matches: Vec::new(),
            scanned: 0,
        }
    }

    /// Score one stored row. `content` is only copied when the row passes the threshold.
    #[inline]
    pub fn offer(&mut self, content: &str, vector: &[f32]) {
        self.scanned += 1;
        if self.limit == 0 {
            return;
        }
        // undefined similarity (zero vector) never passes the filter
        if let Some(similarity) =
            cosine_similarity(vector, self.query).filter(|s| *s > self.min_similarity)
        {
            self.matches.push(SearchResult {
                content: content.to_string(),
                similarity,
            });
        }
    }

    #[inline]
    pub fn scanned(&self) -> usize {
        self.scanned
    }

    /// Ordered results, at most `limit` of them.
    #[inline]
    pub fn finish(mut self) -> Vec<SearchResult> {
        // stable: ties stay in offer order
        self.matches.sort_by(|a, b| descending(a.similarity, b.similarity));
        self.matches.truncate(self.limit);
        self.matches
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Rank `(content, vector)` candidates against `query`.
#[inline]
pub fn rank_by_similarity<'a, I>(
    candidates: I,
    query: &[f32],
    min_similarity: f64,
    limit: usize,
) -> Vec<SearchResult>
where
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let mut ranker = SimilarityRanker::new(query, min_similarity, limit);
    for (content, vector) in candidates {
        ranker.offer(content, vector);
    }
    ranker.finish()
}

/// Query vectors must have the store's dimension.
#[inline]
pub fn check_query_dimension(query: &[f32], dimension: usize) -> Result<()> {
    if query.len() != dimension {
        return Err(RetrievalError::Storage(format!(
            "Query vector has {} dimensions, store expects {}",
            query.len(),
            dimension
        )));
    }
    Ok(())
}

/// Every record in a batch must have the store's dimension.
#[inline]
pub fn check_record_dimensions(records: &[NewEmbedding], dimension: usize) -> Result<()> {
    if let Some(bad) = records
        .iter()
        .find(|record| record.embedding.dimension() != dimension)
    {
        return Err(RetrievalError::Storage(format!(
            "Embedding for chunk {} of resource {} has {} dimensions, store expects {}",
            bad.chunk_index,
            bad.resource_id,
            bad.embedding.dimension(),
            dimension
        )));
    }
    Ok(())
}
