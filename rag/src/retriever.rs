//! Query-time retrieval.

use docqa_core::EmbeddingModel;
use tracing::debug;

use crate::embed::Embedder;
use crate::error::{RagError, Result};
use crate::session::CorpusSession;
use crate::types::RetrievalResult;

/// Embeds a question and finds the closest chunks in the session's corpus.
pub struct Retriever<M> {
    embedder: Embedder<M>,
    session: CorpusSession,
}

impl<M> Clone for Retriever<M> {
    fn clone(&self) -> Self {
        Self {
            embedder: self.embedder.clone(),
            session: self.session.clone(),
        }
    }
}

impl<M> std::fmt::Debug for Retriever<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<M: EmbeddingModel> Retriever<M> {
    /// Creates a retriever over `session`.
    pub const fn new(embedder: Embedder<M>, session: CorpusSession) -> Self {
        Self { embedder, session }
    }

    /// Returns the `min(k, chunks)` chunks closest to `query`, closest first.
    ///
    /// Equal distances are ordered by ascending chunk id.
    ///
    /// # Errors
    /// - [`RagError::InvalidArgument`] for a zero `k` or a blank query
    /// - [`RagError::NoCorpus`] when no document is loaded
    /// - [`RagError::Embedding`] or [`RagError::DimensionMismatch`] from the embedder
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be at least 1".into()));
        }
        if query.trim().is_empty() {
            return Err(RagError::InvalidArgument("query must not be empty".into()));
        }

        let corpus = self.session.current()?;
        let vector = self.embedder.embed_one(query).await?;
        let retrieved = corpus.search(&vector, k)?;

        debug!(
            k,
            hits = retrieved.len(),
            best = retrieved.first().map(|hit| hit.distance),
            "retrieved chunks"
        );
        Ok(retrieved)
    }
}
