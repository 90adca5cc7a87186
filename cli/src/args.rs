//! Command-line arguments and their mapping onto the pipeline configuration.

use std::path::PathBuf;

use clap::Parser;
use docqa_core::SamplingConfig;
use docqa_rag::{IndexKind, RagConfig, prompt::DEFAULT_MAX_CONTEXT_CHARS, prompt::PromptTemplate};

/// Ask questions about a PDF or text file with a local llama.cpp model.
#[derive(Parser, Debug)]
#[command(name = "docqa", version, about)]
pub struct Args {
    /// GGUF model used to generate answers.
    #[arg(short, long, env = "DOCQA_MODEL")]
    pub model: PathBuf,

    /// GGUF model used to embed chunks and questions.
    #[arg(short, long, env = "DOCQA_EMBEDDING_MODEL")]
    pub embedding_model: PathBuf,

    /// Document to load on startup (PDF or plain text).
    #[arg(short, long)]
    pub document: Option<PathBuf>,

    /// Single question to answer (headless mode). Answers and exits.
    #[arg(long, requires = "document")]
    pub prompt: Option<String>,

    /// Number of chunks retrieved per question.
    #[arg(short = 'k', long, default_value_t = 3)]
    pub top_k: usize,

    /// Words per chunk.
    #[arg(long, conflicts_with = "sentences")]
    pub window: Option<usize>,

    /// Chunk the document by sentence instead of by word window.
    #[arg(long)]
    pub sentences: bool,

    /// Character budget for the retrieved context.
    #[arg(long, default_value_t = DEFAULT_MAX_CONTEXT_CHARS)]
    pub max_context_chars: usize,

    /// Upper bound on generated tokens per answer.
    #[arg(long, default_value_t = 100)]
    pub max_new_tokens: u32,

    /// Sampling temperature. 0 decodes greedily.
    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    /// Nucleus sampling cutoff.
    #[arg(long, default_value_t = 0.9)]
    pub top_p: f32,

    /// Fixed sampling seed for reproducible answers.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Wrap prompts in the `[INST]` instruction format.
    #[arg(long)]
    pub instruct: bool,

    /// Layers offloaded to the GPU.
    #[arg(long, default_value_t = 0)]
    pub gpu_layers: u32,

    /// Context window in tokens. Defaults to the model's training context.
    #[arg(long)]
    pub context_length: Option<u32>,

    /// Vector index: `flat` (exact) or `hnsw` (approximate).
    #[arg(long, default_value_t = IndexKind::Flat)]
    pub index: IndexKind,

    /// Directory caching embedded documents between runs.
    #[arg(long, env = "DOCQA_STORE")]
    pub store: Option<PathBuf>,

    /// Owner namespace for cached documents.
    #[arg(long, default_value = "local")]
    pub owner: String,

    /// Quiet mode. Only output answers.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Sampling parameters for the generator.
    #[must_use]
    pub const fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            seed: self.seed,
        }
    }

    /// Pipeline configuration described by the flags. Validated when the pipeline is built.
    #[must_use]
    pub fn rag_config(&self) -> RagConfig {
        let mut builder = RagConfig::builder()
            .default_top_k(self.top_k)
            .max_context_chars(self.max_context_chars)
            .sampling(self.sampling())
            .index(self.index);

        if self.sentences {
            builder = builder.sentences();
        } else if let Some(window) = self.window {
            builder = builder.window(window);
        }
        if self.instruct {
            builder = builder.template(PromptTemplate::instruct());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_rag::ChunkingPolicy;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["docqa", "-m", "gen.gguf", "-e", "embed.gguf"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_the_pipeline_defaults() {
        let args = parse(&[]);
        let config = args.rag_config();
        assert_eq!(config.default_top_k, 3);
        assert_eq!(config.max_context_chars, DEFAULT_MAX_CONTEXT_CHARS);
        assert_eq!(config.chunking, ChunkingPolicy::default());
        assert_eq!(config.index, IndexKind::Flat);
        assert_eq!(config.sampling, SamplingConfig::default());
        assert_eq!(args.owner, "local");
    }

    #[test]
    fn flags_reach_the_config() {
        let args = parse(&[
            "-k",
            "5",
            "--window",
            "50",
            "--temperature",
            "0",
            "--seed",
            "9",
            "--index",
            "hnsw",
            "--instruct",
        ]);
        let config = args.rag_config();
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.chunking, ChunkingPolicy::Window { size: 50 });
        assert!(config.sampling.is_greedy());
        assert_eq!(config.sampling.seed, Some(9));
        assert_eq!(config.index, IndexKind::Hnsw);
        assert_eq!(config.template.answer_marker(), Some("[/INST]"));
    }

    #[test]
    fn sentences_and_window_conflict() {
        let argv = [
            "docqa", "-m", "a.gguf", "-e", "b.gguf", "--sentences", "--window", "10",
        ];
        assert!(Args::try_parse_from(argv).is_err());
        assert_eq!(
            parse(&["--sentences"]).rag_config().chunking,
            ChunkingPolicy::Sentence
        );
    }

    #[test]
    fn headless_prompt_needs_a_document() {
        let argv = ["docqa", "-m", "a.gguf", "-e", "b.gguf", "--prompt", "why?"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn unknown_index_is_rejected() {
        let argv = ["docqa", "-m", "a.gguf", "-e", "b.gguf", "--index", "faiss"];
        assert!(Args::try_parse_from(argv).is_err());
    }
}
