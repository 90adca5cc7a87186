//! Document-to-text extraction.

use alloc::{
    string::{String, ToString},
    vec::Vec,
};

/// Delimiter used by [`TextExtractor::extract_sentences`] when splitting extracted text.
pub const SENTENCE_DELIMITER: &str = ". ";

/// Turns raw document bytes into text.
///
/// Extraction may legitimately produce nothing (a scanned PDF without a text layer, an
/// empty file). Implementations return empty output in that case rather than an error;
/// deciding whether empty text is acceptable is up to the caller.
pub trait TextExtractor: Send + Sync {
    /// Extracts the full text of a document.
    ///
    /// # Errors
    /// Fails when the bytes cannot be decoded as the expected document format.
    fn extract_text(&self, bytes: &[u8]) -> crate::Result<String>;

    /// Extracts the document as an ordered list of sentences.
    ///
    /// The default implementation splits [`extract_text`](TextExtractor::extract_text) on
    /// [`SENTENCE_DELIMITER`], trims each piece, and drops empty pieces.
    ///
    /// # Errors
    /// Propagates failures from [`extract_text`](TextExtractor::extract_text).
    fn extract_sentences(&self, bytes: &[u8]) -> crate::Result<Vec<String>> {
        let text = self.extract_text(bytes)?;
        Ok(split_sentences(&text, SENTENCE_DELIMITER))
    }
}

/// Splits `text` on `delimiter`, trimming pieces and dropping empty ones.
#[must_use]
pub fn split_sentences(text: &str, delimiter: &str) -> Vec<String> {
    text.split(delimiter)
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(ToString::to_string)
        .collect()
}
