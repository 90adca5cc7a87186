//! Configuration for the answering pipeline.

use docqa_core::SamplingConfig;
use serde::{Deserialize, Serialize};

use crate::chunking::{Chunker, DEFAULT_WINDOW, SentenceChunker, WordWindowChunker};
use crate::error::{RagError, Result};
use crate::index::IndexKind;
use crate::prompt::{DEFAULT_CONTEXT_SEPARATOR, DEFAULT_MAX_CONTEXT_CHARS, PromptTemplate};

/// How extracted text is split into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ChunkingPolicy {
    /// Consecutive windows of `size` words.
    Window {
        /// Words per chunk.
        size: usize,
    },
    /// One chunk per sentence, as reported by the text extractor.
    Sentence,
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self::Window {
            size: DEFAULT_WINDOW,
        }
    }
}

impl ChunkingPolicy {
    /// Creates the chunker for this policy.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] for a zero-word window.
    pub fn chunker(self) -> Result<Box<dyn Chunker>> {
        match self {
            Self::Window { size: 0 } => Err(RagError::InvalidArgument(
                "chunk window must be at least one word".into(),
            )),
            Self::Window { size } => Ok(Box::new(WordWindowChunker::new(size))),
            Self::Sentence => Ok(Box::new(SentenceChunker::default())),
        }
    }
}

/// What happens when an ingest starts while another is still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestPolicy {
    /// Fail the second ingest with [`RagError::Busy`].
    #[default]
    Reject,
    /// Wait for the running ingest to finish, then proceed.
    Queue,
}

/// Configuration for a [`Rag`](crate::Rag) instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// How documents are chunked.
    pub chunking: ChunkingPolicy,
    /// Number of chunks retrieved when the caller does not choose.
    pub default_top_k: usize,
    /// Character budget for the joined context.
    pub max_context_chars: usize,
    /// Separator placed between chunks in the context.
    pub context_separator: String,
    /// Prompt layout.
    pub template: PromptTemplate,
    /// Sampling parameters for generation.
    pub sampling: SamplingConfig,
    /// Vector index implementation.
    pub index: IndexKind,
    /// Behavior of overlapping ingests.
    pub ingest_policy: IngestPolicy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingPolicy::default(),
            default_top_k: 3,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            context_separator: DEFAULT_CONTEXT_SEPARATOR.to_owned(),
            template: PromptTemplate::plain(),
            sampling: SamplingConfig::default(),
            index: IndexKind::default(),
            ingest_policy: IngestPolicy::default(),
        }
    }
}

impl RagConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::new()
    }

    /// Checks every field.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if let ChunkingPolicy::Window { size: 0 } = self.chunking {
            return Err(RagError::InvalidArgument(
                "chunk window must be at least one word".into(),
            ));
        }
        if self.default_top_k == 0 {
            return Err(RagError::InvalidArgument(
                "default_top_k must be at least 1".into(),
            ));
        }
        if self.max_context_chars == 0 {
            return Err(RagError::InvalidArgument(
                "max_context_chars must be positive".into(),
            ));
        }
        self.sampling
            .validate()
            .map_err(|err| RagError::InvalidArgument(err.to_string()))
    }
}

/// Builder for [`RagConfig`].
#[derive(Debug, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RagConfig::default(),
        }
    }

    /// Sets the chunking policy.
    #[must_use]
    pub const fn chunking(mut self, policy: ChunkingPolicy) -> Self {
        self.config.chunking = policy;
        self
    }

    /// Chunks into windows of `size` words.
    #[must_use]
    pub const fn window(self, size: usize) -> Self {
        self.chunking(ChunkingPolicy::Window { size })
    }

    /// Chunks one sentence at a time.
    #[must_use]
    pub const fn sentences(self) -> Self {
        self.chunking(ChunkingPolicy::Sentence)
    }

    /// Sets the default number of chunks to retrieve.
    #[must_use]
    pub const fn default_top_k(mut self, k: usize) -> Self {
        self.config.default_top_k = k;
        self
    }

    /// Sets the context character budget.
    #[must_use]
    pub const fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Sets the separator between context chunks.
    #[must_use]
    pub fn context_separator(mut self, separator: impl Into<String>) -> Self {
        self.config.context_separator = separator.into();
        self
    }

    /// Sets the prompt template.
    #[must_use]
    pub fn template(mut self, template: PromptTemplate) -> Self {
        self.config.template = template;
        self
    }

    /// Sets the sampling parameters.
    #[must_use]
    pub const fn sampling(mut self, sampling: SamplingConfig) -> Self {
        self.config.sampling = sampling;
        self
    }

    /// Selects the vector index implementation.
    #[must_use]
    pub const fn index(mut self, kind: IndexKind) -> Self {
        self.config.index = kind;
        self
    }

    /// Sets the overlapping-ingest policy.
    #[must_use]
    pub const fn ingest_policy(mut self, policy: IngestPolicy) -> Self {
        self.config.ingest_policy = policy;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RagConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RagConfig::default();
        assert_eq!(config.chunking, ChunkingPolicy::Window { size: 200 });
        assert_eq!(config.default_top_k, 3);
        assert_eq!(config.max_context_chars, 4000);
        assert_eq!(config.context_separator, "\n");
        assert_eq!(config.template, PromptTemplate::plain());
        assert_eq!(config.index, IndexKind::Flat);
        assert_eq!(config.ingest_policy, IngestPolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_config() {
        let config = RagConfig::builder()
            .sentences()
            .default_top_k(5)
            .max_context_chars(512)
            .context_separator(". ")
            .template(PromptTemplate::instruct())
            .sampling(SamplingConfig::default().temperature(0.0))
            .index(IndexKind::Hnsw)
            .ingest_policy(IngestPolicy::Queue)
            .build();

        assert_eq!(config.chunking, ChunkingPolicy::Sentence);
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.max_context_chars, 512);
        assert_eq!(config.context_separator, ". ");
        assert_eq!(config.template.answer_marker(), Some("[/INST]"));
        assert!(config.sampling.is_greedy());
        assert_eq!(config.index, IndexKind::Hnsw);
        assert_eq!(config.ingest_policy, IngestPolicy::Queue);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        for config in [
            RagConfig::builder().window(0).build(),
            RagConfig::builder().default_top_k(0).build(),
            RagConfig::builder().max_context_chars(0).build(),
            RagConfig::builder()
                .sampling(SamplingConfig::default().top_p(2.0))
                .build(),
        ] {
            assert!(matches!(
                config.validate(),
                Err(RagError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn chunker_for_policy() {
        assert_eq!(
            ChunkingPolicy::default().chunker().unwrap().name(),
            "word_window"
        );
        assert_eq!(ChunkingPolicy::Sentence.chunker().unwrap().name(), "sentence");
        assert!(ChunkingPolicy::Window { size: 0 }.chunker().is_err());
    }

    #[test]
    fn config_from_partial_json() {
        let config: RagConfig = serde_json::from_str(
            r#"{"chunking":{"kind":"window","size":50},"index":"hnsw","default_top_k":2}"#,
        )
        .unwrap();
        assert_eq!(config.chunking, ChunkingPolicy::Window { size: 50 });
        assert_eq!(config.index, IndexKind::Hnsw);
        assert_eq!(config.default_top_k, 2);
        assert_eq!(config.max_context_chars, 4000);
    }
}
