//! Ingest progress reporting.

/// Stages reported while a document is ingested.
///
/// A successful ingest ends with [`Ready`](IngestStage::Ready); a failed one ends with
/// [`RolledBack`](IngestStage::RolledBack).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStage {
    /// Turning document bytes into text.
    Extracting,
    /// Splitting text into chunks.
    Chunking,
    /// Embedding the chunks.
    Embedding {
        /// Number of chunks being embedded.
        chunks: usize,
    },
    /// Building the vector index.
    Indexing,
    /// The new corpus is live.
    Ready,
    /// The ingest failed and the session returned to its previous state.
    RolledBack {
        /// Why the ingest failed.
        reason: String,
    },
}

impl IngestStage {
    /// Returns `true` for the final stage of an ingest.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::RolledBack { .. })
    }
}
