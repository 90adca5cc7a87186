//! Fixed-size word window chunking.

use crate::error::Result;
use crate::types::Chunk;

use super::{Chunker, chunks_from_units};

/// Default number of words per chunk.
pub const DEFAULT_WINDOW: usize = 200;

/// Chunks text into consecutive, non-overlapping windows of whitespace-separated words.
///
/// Words inside a window are joined by a single space, so runs of whitespace and line
/// breaks in the extracted text are normalized away. The final window may be shorter.
///
/// # Example
///
/// ```rust
/// use docqa_rag::chunking::{Chunker, WordWindowChunker};
///
/// let chunker = WordWindowChunker::new(4);
/// let chunks = chunker
///     .chunk("The sky is blue. The grass is green. Water is wet.")
///     .unwrap();
///
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[0].text(), "The sky is blue.");
/// assert_eq!(chunks[2].text(), "Water is wet.");
/// ```
#[derive(Debug, Clone)]
pub struct WordWindowChunker {
    /// Number of words per chunk.
    window: usize,
}

impl WordWindowChunker {
    /// Creates a chunker producing windows of `window` words.
    ///
    /// # Panics
    /// Panics if `window` is zero.
    #[must_use]
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "window must be at least one word");
        Self { window }
    }

    /// Words per chunk.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }
}

impl Default for WordWindowChunker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Chunker for WordWindowChunker {
    fn chunk(&self, text: &str) -> Result<Vec<Chunk>> {
        let words: Vec<&str> = text.split_whitespace().collect();
        chunks_from_units(words.chunks(self.window).map(|window| window.join(" ")))
    }

    fn name(&self) -> &'static str {
        "word_window"
    }
}
