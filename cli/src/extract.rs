//! Picks a text extractor from the document's leading bytes.

use docqa_core::TextExtractor;
use docqa_pdf::PdfExtractor;
use docqa_rag::PlainTextExtractor;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extracts PDFs through their text layer and anything else as UTF-8 text.
#[derive(Debug, Clone, Default)]
pub struct DocumentExtractor {
    pdf: PdfExtractor,
    text: PlainTextExtractor,
}

impl DocumentExtractor {
    /// Returns `true` when `bytes` look like a PDF file.
    #[must_use]
    pub fn is_pdf(bytes: &[u8]) -> bool {
        bytes.trim_ascii_start().starts_with(PDF_MAGIC)
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract_text(&self, bytes: &[u8]) -> docqa_core::Result<String> {
        if Self::is_pdf(bytes) {
            self.pdf.extract_text(bytes)
        } else {
            self.text.extract_text(bytes)
        }
    }

    fn extract_sentences(&self, bytes: &[u8]) -> docqa_core::Result<Vec<String>> {
        if Self::is_pdf(bytes) {
            self.pdf.extract_sentences(bytes)
        } else {
            self.text.extract_sentences(bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_pdf_header() {
        assert!(DocumentExtractor::is_pdf(b"%PDF-1.7\n..."));
        assert!(DocumentExtractor::is_pdf(b"\n %PDF-1.4"));
        assert!(!DocumentExtractor::is_pdf(b"The sky is blue."));
        assert!(!DocumentExtractor::is_pdf(b""));
    }

    #[test]
    fn text_files_pass_through() {
        let extractor = DocumentExtractor::default();
        assert_eq!(
            extractor.extract_text(b"The sky is blue.").unwrap(),
            "The sky is blue."
        );
        assert_eq!(
            extractor
                .extract_sentences(b"The sky is blue. Water is wet.")
                .unwrap(),
            ["The sky is blue", "Water is wet."]
        );
    }

    #[test]
    fn broken_pdf_is_an_error() {
        assert!(DocumentExtractor::default().extract_text(b"%PDF-1.7 garbage").is_err());
    }
}
