//! Core types for the RAG crate.

use serde::{Deserialize, Serialize};

pub use docqa_core::Embedding;

use crate::index::IndexKind;

/// A contiguous unit of document text, the smallest retrievable item.
///
/// The `id` is the chunk's ordinal within its corpus and doubles as the row of its
/// embedding in the vector index. Chunks are immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    id: usize,
    text: String,
}

impl Chunk {
    /// Creates a chunk.
    #[must_use]
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Ordinal of this chunk within its corpus.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Text content of the chunk.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the chunk, returning its text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// One row returned by a vector index search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    /// Row in the index, equal to the id of the chunk it was built from.
    pub row: usize,
    /// Squared Euclidean distance to the query (lower is closer).
    pub distance: f32,
}

/// A retrieved chunk together with its distance to the query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// The matching chunk.
    pub chunk: Chunk,
    /// Squared Euclidean distance to the query (lower is more relevant).
    pub distance: f32,
}

/// Retrieved chunks, closest first, ties broken by lowest chunk id.
pub type RetrievalResult = Vec<RetrievedChunk>;

/// Summary of the corpus currently loaded in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorpusInfo {
    /// Number of chunks (and index rows).
    pub chunks: usize,
    /// Embedding dimension of the index.
    pub dimension: usize,
    /// Hash over the chunk texts, stable across runs.
    pub fingerprint: u64,
    /// Index implementation serving the corpus.
    pub index: IndexKind,
}

/// Result of a successful ingest.
pub type IngestReport = CorpusInfo;

/// The outcome of a question, with the context that produced it.
#[derive(Clone, Debug)]
pub struct Answer {
    /// Answer text with any echoed prompt removed.
    pub text: String,
    /// The prompt sent to the generator.
    pub prompt: String,
    /// Chunks retrieved for the question, in rank order.
    pub retrieved: RetrievalResult,
}
