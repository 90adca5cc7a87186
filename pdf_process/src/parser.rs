use std::ops::RangeInclusive;

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{PdfError, Result};

pub(crate) fn load(bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))
}

/// Extracts the normalized text of every selected page, in page order.
///
/// Pages whose content stream cannot be decoded are skipped; pages without text
/// contribute nothing.
pub(crate) fn page_texts(doc: &Document, range: Option<&RangeInclusive<usize>>) -> Vec<String> {
    let page_map = doc.get_pages();
    let mut page_numbers: Vec<u32> = page_map.keys().copied().collect();
    page_numbers.sort_unstable();

    let selected = select_pages(&page_numbers, range);
    let mut pages = Vec::with_capacity(selected.len());

    for page_number in selected {
        match doc.extract_text(&[page_number]) {
            Ok(raw) => {
                let text = normalize_text(&raw);
                if !text.is_empty() {
                    pages.push(text);
                }
            }
            Err(err) => warn!(page = page_number, error = %err, "skipping unreadable PDF page"),
        }
    }

    debug!(
        total = page_numbers.len(),
        extracted = pages.len(),
        "extracted PDF pages"
    );
    pages
}

fn select_pages(pages: &[u32], range: Option<&RangeInclusive<usize>>) -> Vec<u32> {
    match range {
        None => pages.to_vec(),
        Some(range) => pages
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| range.contains(&(idx + 1)).then_some(*p))
            .collect(),
    }
}

fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
