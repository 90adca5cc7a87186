//! Built-in text extraction for plain text documents.

use docqa_core::TextExtractor;

/// Treats document bytes as UTF-8 text.
///
/// Invalid sequences are replaced rather than rejected, so any byte string extracts to
/// something; a binary file simply produces text with little to retrieve.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> docqa_core::Result<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
