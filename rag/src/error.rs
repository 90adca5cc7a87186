//! Error types for the RAG crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while ingesting a document or answering a question.
#[derive(Debug, Error)]
pub enum RagError {
    /// The text-extraction collaborator failed.
    #[error("text extraction failed: {0}")]
    Extraction(#[source] anyhow::Error),

    /// The document produced no non-empty chunks.
    #[error("document contains no text to index")]
    EmptyInput,

    /// The embedding collaborator failed.
    #[error("embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    /// Dimension mismatch between an embedding and the index it is used with.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension provided.
        actual: usize,
    },

    /// A vector index was searched before it was built.
    #[error("vector index has not been built")]
    IndexNotBuilt,

    /// A question was asked while no document is loaded.
    #[error("no document loaded; ingest a document first")]
    NoCorpus,

    /// A caller-supplied argument was out of range or missing.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The generation collaborator failed.
    #[error("generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    /// Chunks and index rows disagree. Always a bug.
    #[error("internal consistency error: {0}")]
    InternalConsistency(String),

    /// Another ingest is already running and the session rejects concurrent ingests.
    #[error("another document is already being ingested")]
    Busy,

    /// Persistence operation failed.
    #[error("persistence error at {path}: {source}")]
    Persistence {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// No stored artifact exists for the requested key.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),
}

impl RagError {
    /// Returns `true` for configuration or programming defects rather than per-request failures.
    ///
    /// A dimension mismatch means the embedding model was swapped without rebuilding the
    /// index; an internal consistency error means the chunk/row invariant was broken.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. } | Self::InternalConsistency(_)
        )
    }
}

/// Result type alias for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors() {
        assert!(
            RagError::DimensionMismatch {
                expected: 384,
                actual: 768
            }
            .is_fatal()
        );
        assert!(RagError::InternalConsistency("row 9 of 3".into()).is_fatal());
        assert!(!RagError::NoCorpus.is_fatal());
        assert!(!RagError::EmptyInput.is_fatal());
        assert!(!RagError::Busy.is_fatal());
    }

    #[test]
    fn no_corpus_message_asks_for_a_document() {
        assert_eq!(
            RagError::NoCorpus.to_string(),
            "no document loaded; ingest a document first"
        );
    }
}
