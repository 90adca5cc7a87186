//! Text chunking strategies.
//!
//! This module provides the [`Chunker`] trait and the two strategies a document can be
//! split with before embedding:
//!
//! - [`WordWindowChunker`]: consecutive windows of a fixed number of words
//! - [`SentenceChunker`]: one chunk per sentence

mod sentence;
mod window;

pub use sentence::SentenceChunker;
pub use window::{DEFAULT_WINDOW, WordWindowChunker};

use crate::error::{RagError, Result};
use crate::types::Chunk;

/// Trait for text chunking strategies.
///
/// Every implementation upholds the same contract: the returned chunks are non-empty,
/// carry dense ids `0..n` in document order, and at least one chunk is produced.
/// Text with nothing to index fails with [`RagError::EmptyInput`].
pub trait Chunker: Send + Sync {
    /// Splits extracted document text into chunks.
    ///
    /// # Errors
    /// Returns [`RagError::EmptyInput`] when the text yields no non-empty chunk.
    fn chunk(&self, text: &str) -> Result<Vec<Chunk>>;

    /// Returns the name of this chunking strategy.
    fn name(&self) -> &'static str;
}

/// Turns pre-split text units into chunks with dense ids.
///
/// Units are trimmed and blank units are skipped, so ids stay contiguous.
///
/// # Errors
/// Returns [`RagError::EmptyInput`] when no unit has any content.
pub fn chunks_from_units<I, S>(units: I) -> Result<Vec<Chunk>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let chunks: Vec<Chunk> = units
        .into_iter()
        .filter_map(|unit| {
            let text = unit.as_ref().trim();
            (!text.is_empty()).then(|| text.to_owned())
        })
        .enumerate()
        .map(|(id, text)| Chunk::new(id, text))
        .collect();

    if chunks.is_empty() {
        return Err(RagError::EmptyInput);
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_get_dense_ids() {
        let chunks = chunks_from_units(["first", "  ", "second", "", " third "]).unwrap();
        let ids: Vec<usize> = chunks.iter().map(Chunk::id).collect();
        let texts: Vec<&str> = chunks.iter().map(Chunk::text).collect();

        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn no_units_is_empty_input() {
        let result = chunks_from_units(Vec::<String>::new());
        assert!(matches!(result, Err(RagError::EmptyInput)));

        let result = chunks_from_units([" ", "\n"]);
        assert!(matches!(result, Err(RagError::EmptyInput)));
    }
}
