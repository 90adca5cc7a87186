//! Persistence of built corpora.
//!
//! Ingesting a large document is expensive: every chunk goes through the embedding
//! model. A [`CorpusSnapshot`] captures the chunk texts and their vectors so the same
//! corpus can be restored later without re-embedding. Snapshots are stored per
//! [`ArtifactKey`], which names the owner and the document.

mod redb_backend;
mod rkyv_backend;

pub use redb_backend::RedbStore;
pub use rkyv_backend::RkyvStore;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::fingerprint::corpus_fingerprint;
use crate::index::IndexKind;
use crate::session::Corpus;
use crate::types::{Chunk, Embedding};

/// Identifies a stored corpus: who uploaded it and which document it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    owner: String,
    document: String,
}

impl ArtifactKey {
    /// Creates a key.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] if either part is blank.
    pub fn new(owner: impl Into<String>, document: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let document = document.into();
        if owner.trim().is_empty() || document.trim().is_empty() {
            return Err(RagError::InvalidArgument(
                "artifact owner and document must not be empty".into(),
            ));
        }
        Ok(Self { owner, document })
    }

    /// The owner part.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The document part.
    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Unambiguous flat encoding of the key.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}:{}/{}", self.owner.len(), self.owner, self.document)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.document)
    }
}

/// Everything needed to rebuild a corpus without re-embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    /// Embedding dimension.
    pub dimension: usize,
    /// Fingerprint of the chunk texts.
    pub fingerprint: u64,
    /// Chunk texts, by id.
    pub chunks: Vec<String>,
    /// Embeddings, by row.
    pub embeddings: Vec<Embedding>,
}

impl CorpusSnapshot {
    /// Captures a corpus.
    #[must_use]
    pub fn from_corpus(corpus: &Corpus) -> Self {
        Self {
            dimension: corpus.index().dimension(),
            fingerprint: corpus.fingerprint(),
            chunks: corpus
                .chunks()
                .iter()
                .map(|chunk| chunk.text().to_owned())
                .collect(),
            embeddings: corpus.index().vectors().to_vec(),
        }
    }

    /// Checks the snapshot against the embedding model it will be searched with.
    ///
    /// # Errors
    /// - [`RagError::DimensionMismatch`] when the stored dimension or any vector differs
    ///   from `dimension`
    /// - [`RagError::EmptyInput`] when the snapshot holds no chunks
    /// - [`RagError::Serialization`] when chunk and vector counts differ or the
    ///   fingerprint does not match the chunk texts
    pub fn validate(&self, dimension: usize) -> Result<()> {
        if self.dimension != dimension {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: self.dimension,
            });
        }
        if self.chunks.is_empty() {
            return Err(RagError::EmptyInput);
        }
        if self.chunks.len() != self.embeddings.len() {
            return Err(RagError::Serialization(format!(
                "snapshot holds {} chunks but {} embeddings",
                self.chunks.len(),
                self.embeddings.len()
            )));
        }
        if let Some(bad) = self.embeddings.iter().find(|e| e.len() != dimension) {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        if corpus_fingerprint(self.chunks.iter().map(String::as_str)) != self.fingerprint {
            return Err(RagError::Serialization(
                "snapshot fingerprint does not match its chunks".into(),
            ));
        }
        Ok(())
    }

    /// Rebuilds a corpus with a fresh index of `kind`.
    ///
    /// # Errors
    /// Fails like [`validate`](CorpusSnapshot::validate) or when the index cannot be built.
    pub fn into_corpus(self, dimension: usize, kind: IndexKind) -> Result<Corpus> {
        self.validate(dimension)?;
        let chunks: Vec<Chunk> = self
            .chunks
            .into_iter()
            .enumerate()
            .map(|(id, text)| Chunk::new(id, text))
            .collect();
        let mut index = kind.create(dimension);
        index.build(self.embeddings)?;
        Corpus::new(chunks, index)
    }
}

/// Trait for snapshot storage backends.
pub trait ArtifactStore: Send + Sync {
    /// Stores a snapshot, replacing any previous one under `key`.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be written.
    fn save(&self, key: &ArtifactKey, snapshot: &CorpusSnapshot) -> Result<()>;

    /// Loads the snapshot under `key`, or `None` if nothing is stored.
    ///
    /// # Errors
    /// Returns an error if stored data cannot be read or decoded.
    fn load(&self, key: &ArtifactKey) -> Result<Option<CorpusSnapshot>>;

    /// Deletes the snapshot under `key`. Returns `true` if one existed.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be modified.
    fn remove(&self, key: &ArtifactKey) -> Result<bool>;

    /// Returns the storage location.
    fn path(&self) -> &Path;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> CorpusSnapshot {
        let chunks = vec!["The sky is blue.".to_owned(), "Water is wet.".to_owned()];
        CorpusSnapshot {
            dimension: 2,
            fingerprint: corpus_fingerprint(chunks.iter().map(String::as_str)),
            chunks,
            embeddings: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        }
    }

    #[test]
    fn key_parts() {
        let key = ArtifactKey::new("alice", "report.pdf").unwrap();
        assert_eq!(key.owner(), "alice");
        assert_eq!(key.document(), "report.pdf");
        assert_eq!(key.to_string(), "alice/report.pdf");
        assert!(ArtifactKey::new("", "report.pdf").is_err());
        assert!(ArtifactKey::new("alice", " ").is_err());
    }

    #[test]
    fn storage_keys_do_not_collide() {
        let a = ArtifactKey::new("a/b", "c").unwrap();
        let b = ArtifactKey::new("a", "b/c").unwrap();
        assert_ne!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn snapshot_rebuilds_corpus() {
        let corpus = snapshot().into_corpus(2, IndexKind::Flat).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(CorpusSnapshot::from_corpus(&corpus), snapshot());
    }

    #[test]
    fn snapshot_for_other_model_is_rejected() {
        assert!(matches!(
            snapshot().validate(384),
            Err(RagError::DimensionMismatch {
                expected: 384,
                actual: 2
            })
        ));
    }

    #[test]
    fn corrupt_snapshots_are_rejected() {
        let mut short = snapshot();
        short.embeddings.pop();
        assert!(matches!(short.validate(2), Err(RagError::Serialization(_))));

        let mut edited = snapshot();
        edited.chunks[0] = "The sky is green.".into();
        assert!(matches!(edited.validate(2), Err(RagError::Serialization(_))));

        let mut ragged = snapshot();
        ragged.embeddings[1] = vec![0.0];
        assert!(matches!(
            ragged.validate(2),
            Err(RagError::DimensionMismatch { .. })
        ));
    }
}
