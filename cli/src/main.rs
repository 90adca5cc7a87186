//! Ask questions about a document from the command line.
//!
//! Loads a generator and an embedding model (both GGUF files run through llama.cpp),
//! ingests one PDF or text file, and answers questions about it from the most relevant
//! chunks.
//!
//! # Usage
//!
//! ```bash
//! # Interactive session
//! docqa -m mistral-7b-instruct.Q4_K_M.gguf -e all-MiniLM-L6-v2.Q8_0.gguf -d paper.pdf
//!
//! # Models from the environment, headless single question
//! export DOCQA_MODEL=mistral-7b-instruct.Q4_K_M.gguf
//! export DOCQA_EMBEDDING_MODEL=all-MiniLM-L6-v2.Q8_0.gguf
//! docqa -d paper.pdf --prompt "What dataset was used?" --quiet
//!
//! # Cache embeddings between runs
//! docqa -d paper.pdf --store ~/.cache/docqa
//!
//! # Questions from a file, one per line
//! docqa -d notes.txt < questions.txt
//! ```

mod args;
mod extract;
mod repl;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use docqa_llama::Llama;
use docqa_rag::{
    ArtifactKey, ArtifactStore, ChunkingPolicy, IngestStage, Rag, RagError, RkyvStore,
    fingerprint::content_hash,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::args::Args;
use crate::extract::DocumentExtractor;
use crate::repl::{Input, LineReader};

type DocQa = Rag<Llama, Llama, DocumentExtractor>;

const NO_DOCUMENT: &str = "Please load a document first (--document <path> or /load <path>).";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let session = Session::open(&args)?;

    if !args.quiet {
        println!("docqa");
        println!("Model: {}", session.rag.generator().name());
        println!("Embeddings: {}", session.rag.embedding_model().name());
        if args.prompt.is_none() {
            println!("Commands: /load <path>, /info, /sources, /reset, /quit");
        }
        println!();
    }

    if let Some(ref document) = args.document {
        session.load(document).await?;
    }

    // Headless mode: answer one question and exit
    if let Some(ref prompt) = args.prompt {
        let answer = session.rag.ask(prompt).await?;
        println!("{answer}");
        return Ok(());
    }

    run_repl(session).await
}

struct Session {
    rag: DocQa,
    store: Option<RkyvStore>,
    owner: String,
    quiet: bool,
    show_sources: bool,
}

impl Session {
    fn open(args: &Args) -> Result<Self> {
        let generator = Llama::builder(expand_tilde(&args.model))
            .n_gpu_layers(args.gpu_layers);
        let generator = match args.context_length {
            Some(n_ctx) => generator.n_ctx(n_ctx),
            None => generator,
        }
        .build()
        .with_context(|| format!("failed to load model {}", args.model.display()))?;

        let embedder = Llama::builder(expand_tilde(&args.embedding_model))
            .n_gpu_layers(args.gpu_layers)
            .build()
            .with_context(|| {
                format!(
                    "failed to load embedding model {}",
                    args.embedding_model.display()
                )
            })?;

        let rag = Rag::builder(embedder, generator)
            .extractor(DocumentExtractor::default())
            .config(args.rag_config())
            .build()
            .context("invalid configuration")?;

        Ok(Self {
            rag,
            store: args.store.as_deref().map(|dir| RkyvStore::new(expand_tilde(dir))),
            owner: args.owner.clone(),
            quiet: args.quiet,
            show_sources: false,
        })
    }

    async fn load(&self, path: &Path) -> Result<()> {
        let path = expand_tilde(path);
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        let key = match self.store {
            Some(_) => Some(self.artifact_key(&path, &bytes)?),
            None => None,
        };

        if let (Some(store), Some(key)) = (&self.store, &key) {
            match self.rag.restore(store, key).await {
                Ok(info) => {
                    self.status(&format!(
                        "Restored {} chunks for {} from {}",
                        info.chunks,
                        path.display(),
                        store.path().display()
                    ));
                    return Ok(());
                }
                Err(RagError::ArtifactNotFound(_)) => {}
                Err(err) => warn!(key = %key, error = %err, "cached corpus unusable; re-embedding"),
            }
        }

        let quiet = self.quiet;
        let info = self
            .rag
            .ingest_with_progress(&bytes, |stage| {
                if !quiet {
                    print_stage(&stage);
                }
            })
            .await
            .with_context(|| format!("failed to load {}", path.display()))?;

        if let (Some(store), Some(key)) = (&self.store, &key) {
            if let Err(err) = self.rag.export(store, key) {
                warn!(key = %key, error = %err, "failed to cache corpus");
            }
        }

        self.status(&format!(
            "Loaded {} ({} chunks, {}-dimensional embeddings, {} index)",
            path.display(),
            info.chunks,
            info.dimension,
            info.index
        ));
        Ok(())
    }

    /// Cache key covering the document bytes, the embedding model, and the chunking policy.
    fn artifact_key(&self, path: &Path, bytes: &[u8]) -> Result<ArtifactKey> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let document = format!(
            "{stem}.{model}.{chunking}.{hash:016x}",
            model = self.rag.embedding_model().name(),
            chunking = chunking_tag(self.rag.config().chunking),
            hash = content_hash(bytes),
        );
        Ok(ArtifactKey::new(self.owner.as_str(), document)?)
    }

    async fn answer(&self, question: &str) {
        let k = self.rag.config().default_top_k;
        match self.rag.ask_detailed(question, k).await {
            Ok(answer) => {
                println!("{}", answer.text);
                if self.show_sources {
                    for hit in &answer.retrieved {
                        println!(
                            "  [{} | {:.3}] {}",
                            hit.chunk.id(),
                            hit.distance,
                            truncate(hit.chunk.text(), 100)
                        );
                    }
                }
            }
            Err(RagError::NoCorpus) => println!("{NO_DOCUMENT}"),
            Err(err) => println!("\x1b[31mError: {err}\x1b[0m"),
        }
    }

    fn status(&self, message: &str) {
        if !self.quiet {
            println!("{message}");
        }
    }
}

async fn run_repl(mut session: Session) -> Result<()> {
    let reader = LineReader::new();
    let prompt = if reader.is_interactive() { "You> " } else { "" };

    while let Some(line) = reader.read_line(prompt)? {
        match Input::parse(&line) {
            Input::Blank => {}
            Input::Question(question) => {
                session.answer(&question).await;
                if reader.is_interactive() {
                    println!();
                }
            }
            Input::Command(command) => {
                let (name, rest) = command
                    .split_once(char::is_whitespace)
                    .map_or((command.as_str(), ""), |(name, rest)| (name, rest.trim()));
                match name.to_ascii_lowercase().as_str() {
                    "quit" | "exit" | "q" => break,
                    "load" if !rest.is_empty() => {
                        if let Err(err) = session.load(Path::new(rest)).await {
                            println!("\x1b[31mError: {err:#}\x1b[0m");
                        }
                    }
                    "load" => println!("Usage: /load <path>"),
                    "info" => match session.rag.corpus_info() {
                        Some(info) => println!(
                            "{} chunks, {}-dimensional embeddings, {} index, fingerprint {:016x}",
                            info.chunks, info.dimension, info.index, info.fingerprint
                        ),
                        None => println!("No document loaded ({}).", session.rag.state()),
                    },
                    "sources" => {
                        session.show_sources = !session.show_sources;
                        println!(
                            "Retrieved chunks will be {}.",
                            if session.show_sources { "shown" } else { "hidden" }
                        );
                    }
                    "reset" => {
                        if session.rag.reset() {
                            println!("Document unloaded.");
                        } else {
                            println!("No document loaded.");
                        }
                    }
                    other => {
                        println!("Unknown command: {other}");
                        println!("Available: /load <path>, /info, /sources, /reset, /quit");
                    }
                }
            }
        }
    }

    if !session.quiet {
        println!("Goodbye!");
    }
    Ok(())
}

fn print_stage(stage: &IngestStage) {
    match stage {
        IngestStage::Extracting => println!("Extracting text..."),
        IngestStage::Chunking => println!("Chunking..."),
        IngestStage::Embedding { chunks } => println!("Embedding {chunks} chunks..."),
        IngestStage::Indexing => println!("Indexing..."),
        IngestStage::Ready => {}
        IngestStage::RolledBack { reason } => println!("Ingest failed: {reason}"),
    }
}

fn chunking_tag(policy: ChunkingPolicy) -> String {
    match policy {
        ChunkingPolicy::Window { size } => format!("w{size}"),
        ChunkingPolicy::Sentence => "sentences".to_string(),
    }
}

/// Expand ~ to home directory in a path.
fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(stripped), Some(home)) => home.join(stripped),
        _ => path.to_path_buf(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_tags_differ_per_policy() {
        assert_eq!(chunking_tag(ChunkingPolicy::Window { size: 200 }), "w200");
        assert_eq!(chunking_tag(ChunkingPolicy::Sentence), "sentences");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn tilde_only_expands_as_a_prefix() {
        assert_eq!(expand_tilde(Path::new("/tmp/doc.pdf")), PathBuf::from("/tmp/doc.pdf"));
        assert_eq!(expand_tilde(Path::new("a/~/b")), PathBuf::from("a/~/b"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/doc.pdf")), home.join("doc.pdf"));
        }
    }
}
