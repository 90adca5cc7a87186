//! PDF text extraction for docqa.
//!
//! [`PdfExtractor`] reads the text layer of a PDF with `lopdf` and implements
//! [`TextExtractor`], so it can be plugged straight into the retrieval pipeline.
//! Scanned PDFs without a text layer extract to an empty string.

mod error;
mod parser;

pub use error::{PdfError, Result};

use docqa_core::{SENTENCE_DELIMITER, TextExtractor, extraction::split_sentences};
use std::{ops::RangeInclusive, path::Path};

/// Extracts the text layer of a PDF, page by page.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    page_range: Option<RangeInclusive<usize>>,
}

impl PdfExtractor {
    /// Extractor covering every page.
    #[must_use]
    pub const fn new() -> Self {
        Self { page_range: None }
    }

    /// Restrict extraction to a 1-based, inclusive range of pages.
    #[must_use]
    pub fn with_page_range(mut self, range: RangeInclusive<usize>) -> Self {
        self.page_range = Some(range);
        self
    }

    /// Text of each non-empty page, in page order.
    ///
    /// # Errors
    /// Returns [`PdfError::Parse`] when the bytes are not a PDF.
    pub fn pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let doc = parser::load(bytes)?;
        Ok(parser::page_texts(&doc, self.page_range.as_ref()))
    }

    /// Reads a PDF from disk and returns its text, pages separated by newlines.
    ///
    /// # Errors
    /// Fails when the file cannot be read or is not a PDF.
    pub fn extract_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(self.pages(&bytes)?.join("\n"))
    }
}

impl TextExtractor for PdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> docqa_core::Result<String> {
        Ok(self.pages(bytes)?.join("\n"))
    }

    fn extract_sentences(&self, bytes: &[u8]) -> docqa_core::Result<Vec<String>> {
        // Sentences may run across line and page breaks.
        let text = self.pages(bytes)?.join(" ").replace('\n', " ");
        Ok(split_sentences(&text, SENTENCE_DELIMITER))
    }
}
