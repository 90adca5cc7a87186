//! Batch embedding with contract checks.

use std::sync::Arc;

use docqa_core::EmbeddingModel;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::types::Embedding;

/// Wraps an [`EmbeddingModel`] and enforces its output contract.
///
/// Every vector that leaves the embedder has exactly [`dimension`](Embedder::dimension)
/// elements, and a batch always yields one vector per input, in input order.
pub struct Embedder<M> {
    model: Arc<M>,
}

impl<M> Clone for Embedder<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
        }
    }
}

impl<M> std::fmt::Debug for Embedder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder").finish_non_exhaustive()
    }
}

impl<M: EmbeddingModel> Embedder<M> {
    /// Wraps a model.
    pub fn new(model: M) -> Self {
        Self::from_arc(Arc::new(model))
    }

    /// Wraps a shared model.
    pub const fn from_arc(model: Arc<M>) -> Self {
        Self { model }
    }

    /// The model's fixed output dimension.
    pub fn dimension(&self) -> usize {
        self.model.dim()
    }

    /// Returns the underlying model.
    pub const fn model(&self) -> &Arc<M> {
        &self.model
    }

    /// Embeds `texts`, returning one vector per input in the same order.
    ///
    /// # Errors
    /// - [`RagError::Embedding`] when the model fails or returns the wrong number of vectors
    /// - [`RagError::DimensionMismatch`] when a vector does not match the model's dimension
    pub async fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let embeddings = self
            .model
            .embed_batch(texts)
            .await
            .map_err(RagError::Embedding)?;

        if embeddings.len() != texts.len() {
            return Err(RagError::Embedding(anyhow::anyhow!(
                "model returned {} vectors for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }

        let expected = self.dimension();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        debug!(count = embeddings.len(), dimension = expected, "embedded batch");
        Ok(embeddings)
    }

    /// Embeds a single text.
    ///
    /// # Errors
    /// Same as [`embed`](Embedder::embed).
    pub async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| RagError::Embedding(anyhow::anyhow!("model returned no vector")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lengths;

    impl EmbeddingModel for Lengths {
        fn dim(&self) -> usize {
            2
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> docqa_core::Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    struct Lying;

    impl EmbeddingModel for Lying {
        fn dim(&self) -> usize {
            3
        }

        async fn embed(&self, _text: &str) -> docqa_core::Result<Vec<f32>> {
            Ok(vec![0.0; 5])
        }
    }

    struct Dropping;

    impl EmbeddingModel for Dropping {
        fn dim(&self) -> usize {
            1
        }

        async fn embed(&self, _text: &str) -> docqa_core::Result<Vec<f32>> {
            Ok(vec![0.0])
        }

        async fn embed_batch(&self, _texts: &[&str]) -> docqa_core::Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.0]])
        }
    }

    struct Broken;

    impl EmbeddingModel for Broken {
        fn dim(&self) -> usize {
            1
        }

        async fn embed(&self, _text: &str) -> docqa_core::Result<Vec<f32>> {
            anyhow::bail!("model not loaded")
        }
    }

    #[tokio::test]
    async fn keeps_input_order() {
        let embedder = Embedder::new(Lengths);
        let vectors = embedder.embed(&["a", "abc", "ab"]).await.unwrap();
        let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(lengths, vec![1.0, 3.0, 2.0]);
    }

    #[tokio::test]
    async fn single_text() {
        let vector = Embedder::new(Lengths).embed_one("four").await.unwrap();
        assert_eq!(vector, vec![4.0, 1.0]);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let result = Embedder::new(Lying).embed(&["x"]).await;
        assert!(matches!(
            result,
            Err(RagError::DimensionMismatch {
                expected: 3,
                actual: 5
            })
        ));
    }

    #[tokio::test]
    async fn short_batch_is_rejected() {
        let result = Embedder::new(Dropping).embed(&["x", "y"]).await;
        assert!(matches!(result, Err(RagError::Embedding(_))));
    }

    #[tokio::test]
    async fn model_failure_is_embedding_error() {
        let err = Embedder::new(Broken).embed_one("x").await.unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert!(err.to_string().contains("model not loaded"));
    }
}
