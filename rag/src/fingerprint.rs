//! Content fingerprints using xxhash.

use xxhash_rust::xxh3::{Xxh3, xxh3_64};

use crate::types::Chunk;

/// Computes a content hash for a single text or raw document.
#[must_use]
pub fn content_hash(content: impl AsRef<[u8]>) -> u64 {
    xxh3_64(content.as_ref())
}

/// Computes a fingerprint over a corpus's chunk texts, in order.
///
/// Chunk boundaries are part of the hash, so the same words chunked differently
/// produce different fingerprints.
#[must_use]
pub fn corpus_fingerprint<'a>(texts: impl IntoIterator<Item = &'a str>) -> u64 {
    let mut hasher = Xxh3::new();
    for text in texts {
        hasher.update(&(text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    hasher.digest()
}

/// Fingerprint of a chunk list.
#[must_use]
pub fn chunks_fingerprint(chunks: &[Chunk]) -> u64 {
    corpus_fingerprint(chunks.iter().map(Chunk::text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_same_hash() {
        let text = "Hello, world!";
        assert_eq!(content_hash(text), content_hash(text));
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(content_hash("Hello, world!"), content_hash("Goodbye, world!"));
    }

    #[test]
    fn boundaries_matter() {
        assert_ne!(
            corpus_fingerprint(["ab", "c"]),
            corpus_fingerprint(["a", "bc"])
        );
    }

    #[test]
    fn chunks_match_texts() {
        let chunks = vec![Chunk::new(0, "The sky is blue."), Chunk::new(1, "Water is wet.")];
        assert_eq!(
            chunks_fingerprint(&chunks),
            corpus_fingerprint(["The sky is blue.", "Water is wet."])
        );
    }
}
