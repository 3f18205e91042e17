// Shared fixtures for integration tests

use async_trait::async_trait;
use floatchat_retrieval::Result;
use floatchat_retrieval::embeddings::{Embedder, Embedding};

pub const TEST_DIMENSION: usize = 512;

pub const OCEAN: &str = "The ocean is deep. The ocean is salty. Fish live there.";

/// Deterministic bag-of-words embedder: every lowercase word is hashed into a bucket.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut values = vec![0.0; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            values[bucket(&word.to_lowercase(), self.dimension)] += 1.0;
        }
        values
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(TEST_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model(&self) -> &str {
        "hashing-bag-of-words"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        texts
            .iter()
            .map(|text| Embedding::try_new(self.vector(text), self.dimension))
            .collect()
    }

    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        Embedding::try_new(self.vector(text), self.dimension)
    }
}

// FNV-1a
fn bucket(word: &str, dimension: usize) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % dimension as u64) as usize
}

pub fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}
