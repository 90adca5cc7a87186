//! # docqa
//!
//! Ask questions about a single document with retrieval-augmented generation.
//!
//! This façade re-exports the collaborator traits from [`docqa_core`] and the pipeline from
//! [`docqa_rag`]. Backends are opt-in:
//!
//! | Feature | Crate | Provides |
//! |---------|-------|----------|
//! | `llama` | `docqa-llama` | GGUF generation and embeddings through llama.cpp |
//! | `pdf` | `docqa-pdf` | PDF text extraction |
//! | `full` | both | everything |
//!
//! ## Example
//!
//! ```rust,ignore
//! use docqa::{Rag, llama::Llama, pdf::PdfExtractor};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let generator = Llama::from_file("mistral-7b-instruct.Q4_K_M.gguf")?;
//! let embedder = Llama::from_file("all-MiniLM-L6-v2.Q8_0.gguf")?;
//! let rag = Rag::builder(embedder, generator)
//!     .extractor(PdfExtractor::new())
//!     .build()?;
//!
//! rag.ingest(&std::fs::read("paper.pdf")?).await?;
//! println!("{}", rag.ask("What dataset was used?").await?);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use docqa_core::{
    Embedding, EmbeddingModel, Generator, SENTENCE_DELIMITER, SamplingConfig, TextExtractor,
};
pub use docqa_rag::*;

/// llama.cpp backend.
#[cfg(feature = "llama")]
#[cfg_attr(docsrs, doc(cfg(feature = "llama")))]
pub mod llama {
    pub use docqa_llama::*;
}

/// PDF text extraction.
#[cfg(feature = "pdf")]
#[cfg_attr(docsrs, doc(cfg(feature = "pdf")))]
pub mod pdf {
    pub use docqa_pdf::*;
}

#[cfg(test)]
mod tests {
    use crate::{
        ArtifactKey, EmbeddingModel, Generator, IndexKind, Rag, RagConfig, RagError, RkyvStore,
        SamplingConfig, SessionState,
    };

    struct Letters;

    impl EmbeddingModel for Letters {
        fn dim(&self) -> usize {
            26
        }

        async fn embed(&self, text: &str) -> docqa_core::Result<Vec<f32>> {
            let mut counts = vec![0.0; 26];
            for byte in text
                .to_ascii_lowercase()
                .bytes()
                .filter(u8::is_ascii_lowercase)
            {
                counts[usize::from(byte - b'a')] += 1.0;
            }
            Ok(counts)
        }
    }

    struct FirstLine;

    impl Generator for FirstLine {
        async fn generate(&self, prompt: &str, _: &SamplingConfig) -> docqa_core::Result {
            let context = prompt
                .strip_prefix("Context:\n")
                .and_then(|rest| rest.lines().next())
                .unwrap_or_default();
            Ok(format!("  {context}  "))
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[tokio::test]
    async fn answers_and_round_trips_through_a_store() {
        init_tracing();
        let config = RagConfig::builder().window(4).index(IndexKind::Hnsw).build();
        let rag = Rag::builder(Letters, FirstLine)
            .config(config.clone())
            .build()
            .unwrap();

        assert!(matches!(rag.ask("anything").await, Err(RagError::NoCorpus)));

        rag.ingest(b"zzz zzz zzz zzz aaa bbb ccc ddd").await.unwrap();
        assert_eq!(rag.state(), SessionState::Ready);
        assert_eq!(rag.ask_with_k("zzz zzz zzz zzz", 1).await.unwrap(), "zzz zzz zzz zzz");

        let dir = tempfile::tempdir().unwrap();
        let store = RkyvStore::new(dir.path());
        let key = ArtifactKey::new("tester", "letters").unwrap();
        let exported = rag.export(&store, &key).unwrap();

        let restored = Rag::builder(Letters, FirstLine).config(config).build().unwrap();
        let info = restored.restore(&store, &key).await.unwrap();
        assert_eq!(info, exported);
        assert_eq!(
            restored.ask_with_k("aaa bbb ccc ddd", 1).await.unwrap(),
            "aaa bbb ccc ddd"
        );
    }
}
