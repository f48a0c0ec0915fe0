//! Embedding backend over an LLM provider.

use async_trait::async_trait;
use autoagents_llm::LLMProvider;
use scholar_rs_memory::{Embedder, MemoryError};
use std::sync::Arc;

/// [`Embedder`] that calls the provider's embedding endpoint one text at a time.
#[derive(Clone)]
pub struct LlmEmbedder {
    llm: Arc<dyn LLMProvider>,
    dimensions: usize,
}

impl LlmEmbedder {
    pub fn new(llm: Arc<dyn LLMProvider>, dimensions: usize) -> Self {
        Self { llm, dimensions }
    }
}

#[async_trait]
impl Embedder for LlmEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let vectors = self
            .llm
            .embed(vec![text.to_string()])
            .await
            .map_err(|err| MemoryError::Embedding(err.to_string()))?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::Embedding("provider returned no vectors".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::LlmEmbedder;
    use pretty_assertions::assert_eq;
    use scholar_rs_memory::{Embedder, MemoryError};
    use scholar_rs_test_utils::{FailingLLM, FixedLLM};
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_first_vector() {
        let llm = Arc::new(FixedLLM::new("unused").with_embedding(vec![0.25, 0.5, 1.0]));
        let embedder = LlmEmbedder::new(llm, 3);
        assert_eq!(embedder.embed("text").await.expect("embed"), vec![0.25, 0.5, 1.0]);
        assert_eq!(embedder.dimensions(), 3);
    }

    #[tokio::test]
    async fn provider_errors_become_embedding_errors() {
        let embedder = LlmEmbedder::new(Arc::new(FailingLLM::new("quota")), 3);
        let err = embedder.embed("text").await.unwrap_err();
        assert!(matches!(err, MemoryError::Embedding(message) if message.contains("quota")));
    }
}
