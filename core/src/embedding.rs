//! # Embedding Module
//!
//! Embeddings are dense vector representations of text. Texts with similar meaning map to
//! vectors that sit close together, which is what lets the retrieval pipeline find the
//! passages of a document that answer a question.
//!
//! ## Dimension
//!
//! Every model produces vectors of one fixed length, reported by [`EmbeddingModel::dim`].
//! The dimension is decided when the model is loaded and never changes afterwards, so an
//! index built from one model can only be searched with vectors from a model of the same
//! dimension.
//!
//! ## Ordering
//!
//! [`EmbeddingModel::embed_batch`] returns one vector per input, in input order. Indexes
//! join vectors back to their source text purely by position, so implementations that
//! override the batch method must preserve that ordering.
//!
//! ```rust
//! use docqa_core::EmbeddingModel;
//!
//! async fn example<T: EmbeddingModel>(model: &T) -> docqa_core::Result<()> {
//!     let dim = model.dim();
//!     let embedding = model.embed("Hello, world!").await?;
//!     assert_eq!(embedding.len(), dim);
//!     Ok(())
//! }
//! ```

use alloc::vec::Vec;
use core::future::Future;

/// A type alias for an embedding vector of 32-bit floats.
pub type Embedding = Vec<f32>;

/// Converts text to vector representations.
///
/// # Implementation Requirements
///
/// - [`embed`](EmbeddingModel::embed) must return vectors with length equal to [`dim`](EmbeddingModel::dim)
/// - The same text must always map to the same vector for a loaded model
/// - [`embed_batch`](EmbeddingModel::embed_batch) must preserve input order
///
/// # Example
///
/// ```rust
/// use docqa_core::EmbeddingModel;
///
/// struct Constant;
///
/// impl EmbeddingModel for Constant {
///     fn dim(&self) -> usize {
///         384
///     }
///
///     async fn embed(&self, _text: &str) -> docqa_core::Result<Vec<f32>> {
///         Ok(vec![0.0; self.dim()])
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let embedding = Constant.embed("The quick brown fox").await.unwrap();
/// assert_eq!(embedding.len(), 384);
/// # });
/// ```
pub trait EmbeddingModel: Send + Sized + Sync {
    /// Returns the embedding vector dimension.
    ///
    /// Common dimensions include:
    /// - 384 (`all-MiniLM-L6-v2`)
    /// - 768 (`BERT-base`)
    /// - 1536 (`OpenAI text-embedding-ada-002`)
    fn dim(&self) -> usize;

    /// Converts text to an embedding vector.
    ///
    /// Returns a [`Vec<f32>`] with length equal to [`Self::dim`](EmbeddingModel::dim).
    fn embed(&self, text: &str) -> impl Future<Output = crate::Result<Embedding>> + Send;

    /// Converts many texts at once.
    ///
    /// Position `i` of the output belongs to position `i` of the input. The default
    /// implementation embeds sequentially; backends with real batching should override it.
    fn embed_batch(
        &self,
        texts: &[&str],
    ) -> impl Future<Output = crate::Result<Vec<Embedding>>> + Send {
        async move {
            let mut embeddings = Vec::with_capacity(texts.len());
            for text in texts {
                embeddings.push(self.embed(text).await?);
            }
            Ok(embeddings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    struct MockEmbeddingModel {
        dimension: usize,
    }

    impl EmbeddingModel for MockEmbeddingModel {
        fn dim(&self) -> usize {
            self.dimension
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
            let mut embedding = vec![0.0; self.dimension];
            let text_len = text.len();

            for (i, value) in embedding.iter_mut().enumerate() {
                *value = (text_len + i) as f32 * 0.01;
            }

            Ok(embedding)
        }
    }

    #[tokio::test]
    async fn embedding_model_dimension() {
        let model = MockEmbeddingModel { dimension: 768 };
        assert_eq!(model.dim(), 768);
    }

    #[tokio::test]
    async fn embedding_generation() {
        let model = MockEmbeddingModel { dimension: 4 };
        let embedding = model.embed("test").await.unwrap();

        assert_eq!(embedding.len(), 4);
        assert!((embedding[0] - 0.04).abs() < f32::EPSILON);
        assert!((embedding[3] - 0.07).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let model = MockEmbeddingModel { dimension: 3 };

        let batch = model.embed_batch(&["a", "abc", "ab"]).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0], model.embed("a").await.unwrap());
        assert_eq!(batch[1], model.embed("abc").await.unwrap());
        assert_eq!(batch[2], model.embed("ab").await.unwrap());
    }

    #[tokio::test]
    async fn batch_of_nothing_is_empty() {
        let model = MockEmbeddingModel { dimension: 3 };
        assert!(model.embed_batch(&[]).await.unwrap().is_empty());
    }
}
