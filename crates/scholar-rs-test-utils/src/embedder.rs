use async_trait::async_trait;
use scholar_rs_memory::{Embedder, MemoryError};
use scholar_rs_memory::matching::normalize;

/// Deterministic bag-of-characters embedder.
///
/// Identical texts (after whitespace and case normalization) embed to the
/// same vector, so their cosine similarity is 1.0.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut vector = vec![0.0f32; self.dimensions];
        let normalized = normalize(text);
        let chars: Vec<char> = normalized.chars().collect();
        for pair in chars.windows(2) {
            let bucket = (pair[0] as usize * 31 + pair[1] as usize) % self.dimensions;
            vector[bucket] += 1.0;
        }
        if let [single] = chars.as_slice() {
            vector[*single as usize % self.dimensions] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Debug, Clone)]
pub struct FailingEmbedder {
    dimensions: usize,
}

impl FailingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        Err(MemoryError::Embedding("embedder offline".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
