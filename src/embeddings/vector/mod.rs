#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::{Result, RetrievalError};

/// A validated embedding vector.
///
/// Every value is finite and the length matched the dimension the caller
/// expected when the vector was constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Coerce raw provider output into an embedding of exactly `dimension` values.
    ///
    /// A length mismatch is a storage precondition failure: such a vector can
    /// never be stored or compared.
    #[inline]
    pub fn try_new(values: Vec<f32>, dimension: usize) -> Result<Self> {
        if values.len() != dimension {
            return Err(RetrievalError::Storage(format!(
                "Expected embedding with {} dimensions, got {}",
                dimension,
                values.len()
            )));
        }

        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(RetrievalError::Embedding(format!(
                "Embedding contains a non-finite value at position {}",
                position
            )));
        }

        Ok(Self(values))
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Little-endian byte encoding used for BLOB columns.
    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Decode a BLOB written by [`Embedding::to_bytes`].
    #[inline]
    pub fn from_bytes(bytes: &[u8], dimension: usize) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(RetrievalError::Storage(format!(
                "Stored embedding has {} bytes, not a multiple of 4",
                bytes.len()
            )));
        }

        let values = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect::<Vec<_>>();

        Self::try_new(values, dimension)
            .map_err(|e| RetrievalError::Storage(format!("Corrupt stored embedding: {}", e)))
    }
}

impl AsRef<[f32]> for Embedding {
    #[inline]
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Cosine similarity of two vectors, `1 - cosine_distance`.
///
/// Returns `None` when the lengths differ or either vector has zero magnitude,
/// in which case the similarity is undefined and the row can never match.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot = x.mul_add(y, dot);
        norm_a = x.mul_add(x, norm_a);
        norm_b = y.mul_add(y, norm_b);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    // rounding can push identical directions a hair past 1
    Some((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}
