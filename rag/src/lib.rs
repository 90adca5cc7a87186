//! Retrieval-augmented question answering over a single document.
//!
//! The [`Rag`] type glues an [`EmbeddingModel`](docqa_core::EmbeddingModel), a
//! [`Generator`](docqa_core::Generator), and a [`TextExtractor`](docqa_core::TextExtractor)
//! into a two-call API:
//! - [`Rag::ingest`] – extract, chunk, embed, and index one document, replacing the last.
//! - [`Rag::ask`] – embed a question, retrieve the closest chunks, and generate an answer.
//!
//! ```text
//! bytes ─▶ extract ─▶ chunk ─▶ embed ─▶ index ──┐
//!                                               ▼
//! question ─▶ embed ─▶ search ─▶ compose prompt ─▶ generate ─▶ answer
//! ```
//!
//! Chunks are ranked by squared Euclidean distance, with ties going to the earlier chunk.
//! The default index scans exhaustively in parallel, which is instant for the few
//! thousand chunks a document produces; [`IndexKind::Hnsw`] trades exactness for speed
//! on very large documents.
//!
//! Built corpora can be saved and restored through an [`ArtifactStore`], so a document
//! only has to be embedded once.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::{EmbeddingModel, Generator, SamplingConfig};
//! use docqa_rag::{Rag, RagConfig};
//!
//! struct Letters;
//!
//! impl EmbeddingModel for Letters {
//!     fn dim(&self) -> usize {
//!         26
//!     }
//!
//!     async fn embed(&self, text: &str) -> docqa_core::Result<Vec<f32>> {
//!         let mut counts = vec![0.0; 26];
//!         for byte in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
//!             counts[usize::from(byte - b'a')] += 1.0;
//!         }
//!         Ok(counts)
//!     }
//! }
//!
//! struct Echo;
//!
//! impl Generator for Echo {
//!     async fn generate(&self, prompt: &str, _: &SamplingConfig) -> docqa_core::Result {
//!         Ok(format!("{prompt} I read the context."))
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let rag = Rag::builder(Letters, Echo)
//!     .config(RagConfig::builder().window(4).build())
//!     .build()
//!     .unwrap();
//!
//! rag.ingest(b"The sky is blue. The grass is green.").await.unwrap();
//! let answer = rag.ask("What color is the sky?").await.unwrap();
//! assert_eq!(answer, "I read the context.");
//! # });
//! ```

mod answer;
pub mod chunking;
mod config;
mod embed;
mod error;
mod extract;
pub mod fingerprint;
pub mod index;
pub mod persistence;
mod progress;
pub mod prompt;
mod rag;
mod retriever;
mod session;
mod types;

pub use answer::{Answerer, normalize_answer};
pub use config::{ChunkingPolicy, IngestPolicy, RagConfig, RagConfigBuilder};
pub use embed::Embedder;
pub use error::{RagError, Result};
pub use extract::PlainTextExtractor;
pub use index::{IndexKind, VectorIndex};
pub use persistence::{ArtifactKey, ArtifactStore, CorpusSnapshot, RedbStore, RkyvStore};
pub use progress::IngestStage;
pub use prompt::{PromptComposer, PromptTemplate};
pub use rag::{Rag, RagBuilder};
pub use retriever::Retriever;
pub use session::{Corpus, CorpusSession, IngestGuard, SessionState};
pub use types::{
    Answer, Chunk, CorpusInfo, Embedding, IngestReport, Neighbor, RetrievalResult, RetrievedChunk,
};
