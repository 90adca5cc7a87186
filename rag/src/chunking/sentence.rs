//! Sentence-based text chunking.

use docqa_core::{SENTENCE_DELIMITER, extraction::split_sentences};

use crate::error::Result;
use crate::types::Chunk;

use super::{Chunker, chunks_from_units};

/// Chunks text into one chunk per sentence.
///
/// Sentences are found by splitting on a literal delimiter (`". "` by default). The
/// delimiter is consumed, so every sentence but the last loses its closing period.
///
/// # Example
///
/// ```rust
/// use docqa_rag::chunking::{Chunker, SentenceChunker};
///
/// let chunker = SentenceChunker::default();
/// let chunks = chunker.chunk("First sentence. Second sentence.").unwrap();
///
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[0].text(), "First sentence");
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    delimiter: String,
}

impl SentenceChunker {
    /// Creates a chunker splitting on `delimiter`.
    ///
    /// # Panics
    /// Panics if `delimiter` is empty.
    #[must_use]
    pub fn new(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        assert!(!delimiter.is_empty(), "sentence delimiter must not be empty");
        Self { delimiter }
    }

    /// The sentence delimiter.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(SENTENCE_DELIMITER)
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Result<Vec<Chunk>> {
        chunks_from_units(split_sentences(text, &self.delimiter))
    }

    fn name(&self) -> &'static str {
        "sentence"
    }
}
