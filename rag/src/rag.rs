//! High-level question answering over one loaded document.

use std::sync::Arc;

use docqa_core::{EmbeddingModel, Generator, TextExtractor};
use tracing::{debug, info, warn};

use crate::answer::Answerer;
use crate::chunking::{Chunker, chunks_from_units};
use crate::config::{ChunkingPolicy, RagConfig};
use crate::embed::Embedder;
use crate::error::{RagError, Result};
use crate::extract::PlainTextExtractor;
use crate::persistence::{ArtifactKey, ArtifactStore, CorpusSnapshot};
use crate::progress::IngestStage;
use crate::prompt::PromptComposer;
use crate::retriever::Retriever;
use crate::session::{Corpus, CorpusSession, SessionState};
use crate::types::{Answer, Chunk, CorpusInfo, IngestReport, RetrievalResult};

/// Where the text of an ingest comes from.
enum Source<'a> {
    Document(&'a [u8]),
    Text(&'a str),
    Sentences(Vec<String>),
}

/// Answers questions about a single loaded document.
///
/// `Rag` ties the collaborators together: a [`TextExtractor`] turns uploads into text,
/// an [`EmbeddingModel`] vectorizes chunks and questions, and a [`Generator`] writes the
/// answer from the assembled prompt. At most one document is loaded at a time; loading
/// another replaces it.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::Rag;
///
/// let rag = Rag::builder(embedder, generator).build()?;
/// rag.ingest(&std::fs::read("report.txt")?).await?;
/// let answer = rag.ask("What was revenue in 2023?").await?;
/// ```
pub struct Rag<M, G, X = PlainTextExtractor> {
    embedder: Embedder<M>,
    retriever: Retriever<M>,
    answerer: Answerer<G>,
    composer: PromptComposer,
    chunker: Box<dyn Chunker>,
    extractor: X,
    session: CorpusSession,
    config: RagConfig,
}

impl<M, G, X> std::fmt::Debug for Rag<M, G, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rag")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<M, G> Rag<M, G>
where
    M: EmbeddingModel,
    G: Generator,
{
    /// Starts building a pipeline around an embedding model and a generator.
    ///
    /// Documents are read as UTF-8 text until [`RagBuilder::extractor`] says otherwise.
    pub fn builder(embedder: M, generator: G) -> RagBuilder<M, G> {
        RagBuilder {
            embedder: Arc::new(embedder),
            generator: Arc::new(generator),
            extractor: PlainTextExtractor,
            config: RagConfig::default(),
        }
    }

    /// Creates a pipeline with the default configuration.
    ///
    /// # Errors
    /// Never fails with the default configuration; see [`RagBuilder::build`].
    pub fn new(embedder: M, generator: G) -> Result<Self> {
        Self::builder(embedder, generator).build()
    }
}

impl<M, G, X> Rag<M, G, X>
where
    M: EmbeddingModel,
    G: Generator,
    X: TextExtractor,
{
    /// Loads a document, replacing the current one.
    ///
    /// # Errors
    /// - [`RagError::Busy`] when another ingest is running and the policy rejects
    /// - [`RagError::Extraction`] when the extractor fails
    /// - [`RagError::EmptyInput`] when the document has no text
    /// - [`RagError::Embedding`] or [`RagError::DimensionMismatch`] from the embedder
    ///
    /// On any error after the ingest started, the previously loaded document (if any)
    /// stays loaded.
    pub async fn ingest(&self, document: &[u8]) -> Result<IngestReport> {
        self.run_ingest(Source::Document(document), &mut |_: IngestStage| {})
            .await
    }

    /// Like [`ingest`](Rag::ingest), reporting each stage to `on_progress`.
    ///
    /// # Errors
    /// Same as [`ingest`](Rag::ingest).
    pub async fn ingest_with_progress<F>(
        &self,
        document: &[u8],
        mut on_progress: F,
    ) -> Result<IngestReport>
    where
        F: FnMut(IngestStage) + Send,
    {
        self.run_ingest(Source::Document(document), &mut on_progress)
            .await
    }

    /// Loads already extracted text, chunked with the configured policy.
    ///
    /// # Errors
    /// Same as [`ingest`](Rag::ingest), minus extraction failures.
    pub async fn ingest_text(&self, text: &str) -> Result<IngestReport> {
        self.run_ingest(Source::Text(text), &mut |_: IngestStage| {}).await
    }

    /// Loads pre-split sentences, one chunk each, regardless of the chunking policy.
    ///
    /// # Errors
    /// Same as [`ingest`](Rag::ingest), minus extraction failures.
    pub async fn ingest_sentences(&self, sentences: Vec<String>) -> Result<IngestReport> {
        self.run_ingest(Source::Sentences(sentences), &mut |_: IngestStage| {})
            .await
    }

    /// Answers `query` from the [`default_top_k`](RagConfig::default_top_k) closest chunks.
    ///
    /// # Errors
    /// See [`ask_detailed`](Rag::ask_detailed).
    pub async fn ask(&self, query: &str) -> Result<String> {
        self.ask_with_k(query, self.config.default_top_k).await
    }

    /// Answers `query` from the `k` closest chunks.
    ///
    /// # Errors
    /// See [`ask_detailed`](Rag::ask_detailed).
    pub async fn ask_with_k(&self, query: &str, k: usize) -> Result<String> {
        Ok(self.ask_detailed(query, k).await?.text)
    }

    /// Answers `query`, returning the prompt and retrieved chunks along with the text.
    ///
    /// # Errors
    /// - [`RagError::NoCorpus`] when no document is loaded
    /// - [`RagError::InvalidArgument`] for a zero `k` or a blank query
    /// - [`RagError::Embedding`], [`RagError::DimensionMismatch`] from the embedder
    /// - [`RagError::Generation`] when the generator fails
    pub async fn ask_detailed(&self, query: &str, k: usize) -> Result<Answer> {
        let retrieved = self.retriever.retrieve(query, k).await?;
        let prompt = self.composer.compose(query, &retrieved);
        debug!(prompt_chars = prompt.chars().count(), "composed prompt");

        let text = self.answerer.answer(&prompt).await?;
        Ok(Answer {
            text,
            prompt,
            retrieved,
        })
    }

    /// Returns the `k` chunks closest to `query` without generating an answer.
    ///
    /// # Errors
    /// See [`Retriever::retrieve`].
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        self.retriever.retrieve(query, k).await
    }

    /// Saves the loaded corpus under `key`.
    ///
    /// # Errors
    /// Returns [`RagError::NoCorpus`] when nothing is loaded, or the store's error.
    pub fn export<S>(&self, store: &S, key: &ArtifactKey) -> Result<CorpusInfo>
    where
        S: ArtifactStore + ?Sized,
    {
        let corpus = self.session.current()?;
        store.save(key, &CorpusSnapshot::from_corpus(&corpus))?;
        info!(key = %key, chunks = corpus.len(), "exported corpus");
        Ok(corpus.info())
    }

    /// Loads the corpus saved under `key`, replacing the current one.
    ///
    /// The stored vectors are reused as-is, so no embedding happens. The snapshot must
    /// have been made with a model of the same dimension.
    ///
    /// # Errors
    /// - [`RagError::ArtifactNotFound`] when nothing is stored under `key`
    /// - [`RagError::DimensionMismatch`] when the snapshot belongs to another model
    /// - [`RagError::Busy`] when an ingest is running and the policy rejects
    pub async fn restore<S>(&self, store: &S, key: &ArtifactKey) -> Result<IngestReport>
    where
        S: ArtifactStore + ?Sized,
    {
        let guard = self.session.begin_ingest(self.config.ingest_policy).await?;
        let corpus = store
            .load(key)?
            .ok_or_else(|| RagError::ArtifactNotFound(key.to_string()))
            .and_then(|snapshot| {
                snapshot.into_corpus(self.embedder.dimension(), self.config.index)
            });

        match corpus {
            Ok(corpus) => {
                let report = guard.commit(corpus).info();
                info!(key = %key, chunks = report.chunks, "restored corpus");
                Ok(report)
            }
            Err(err) => {
                guard.rollback();
                warn!(key = %key, error = %err, "restore failed; previous corpus kept");
                Err(err)
            }
        }
    }

    /// The session's lifecycle state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Summary of the loaded corpus, if any.
    pub fn corpus_info(&self) -> Option<CorpusInfo> {
        self.session.info()
    }

    /// Unloads the current document. Returns `true` if one was loaded.
    pub fn reset(&self) -> bool {
        self.session.clear()
    }

    /// The active configuration.
    pub const fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The shared session handle.
    pub const fn session(&self) -> &CorpusSession {
        &self.session
    }

    /// The embedding model.
    pub fn embedding_model(&self) -> &M {
        self.embedder.model()
    }

    /// The generator.
    pub fn generator(&self) -> &G {
        self.answerer.generator()
    }

    /// The text extractor.
    pub const fn extractor(&self) -> &X {
        &self.extractor
    }

    async fn run_ingest<F>(&self, source: Source<'_>, on_progress: &mut F) -> Result<IngestReport>
    where
        F: FnMut(IngestStage) + Send,
    {
        let guard = self.session.begin_ingest(self.config.ingest_policy).await?;

        match self.build_corpus(source, on_progress).await {
            Ok(corpus) => {
                let report = guard.commit(corpus).info();
                info!(
                    chunks = report.chunks,
                    dimension = report.dimension,
                    fingerprint = report.fingerprint,
                    index = %report.index,
                    "document loaded"
                );
                on_progress(IngestStage::Ready);
                Ok(report)
            }
            Err(err) => {
                guard.rollback();
                warn!(error = %err, "ingest failed; previous state restored");
                on_progress(IngestStage::RolledBack {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn build_corpus<F>(&self, source: Source<'_>, on_progress: &mut F) -> Result<Corpus>
    where
        F: FnMut(IngestStage) + Send,
    {
        let chunks = match source {
            Source::Document(bytes) => {
                on_progress(IngestStage::Extracting);
                self.chunk_document(bytes, on_progress)?
            }
            Source::Text(text) => {
                on_progress(IngestStage::Chunking);
                self.chunker.chunk(text)?
            }
            Source::Sentences(sentences) => {
                on_progress(IngestStage::Chunking);
                chunks_from_units(sentences)?
            }
        };

        on_progress(IngestStage::Embedding {
            chunks: chunks.len(),
        });
        let texts: Vec<&str> = chunks.iter().map(Chunk::text).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        on_progress(IngestStage::Indexing);
        let mut index = self.config.index.create(self.embedder.dimension());
        index.build(embeddings)?;
        Corpus::new(chunks, index)
    }

    fn chunk_document<F>(&self, bytes: &[u8], on_progress: &mut F) -> Result<Vec<Chunk>>
    where
        F: FnMut(IngestStage) + Send,
    {
        if self.config.chunking == ChunkingPolicy::Sentence {
            let sentences = self
                .extractor
                .extract_sentences(bytes)
                .map_err(RagError::Extraction)?;
            on_progress(IngestStage::Chunking);
            return chunks_from_units(sentences);
        }

        let text = self
            .extractor
            .extract_text(bytes)
            .map_err(RagError::Extraction)?;
        on_progress(IngestStage::Chunking);
        self.chunker.chunk(&text)
    }
}

/// Builder for [`Rag`].
pub struct RagBuilder<M, G, X = PlainTextExtractor> {
    embedder: Arc<M>,
    generator: Arc<G>,
    extractor: X,
    config: RagConfig,
}

impl<M, G, X> std::fmt::Debug for RagBuilder<M, G, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<M, G, X> RagBuilder<M, G, X>
where
    M: EmbeddingModel,
    G: Generator,
    X: TextExtractor,
{
    /// Uses `extractor` to turn documents into text.
    pub fn extractor<Y: TextExtractor>(self, extractor: Y) -> RagBuilder<M, G, Y> {
        RagBuilder {
            embedder: self.embedder,
            generator: self.generator,
            extractor,
            config: self.config,
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and assembles the pipeline.
    ///
    /// # Errors
    /// Returns [`RagError::InvalidArgument`] if the configuration is invalid.
    pub fn build(self) -> Result<Rag<M, G, X>> {
        let config = self.config;
        config.validate()?;

        let session = CorpusSession::new();
        let embedder = Embedder::from_arc(self.embedder);
        let retriever = Retriever::new(embedder.clone(), session.clone());
        let answerer = Answerer::new(
            self.generator,
            config.sampling,
            config.template.answer_marker().map(str::to_owned),
        );
        let composer = PromptComposer::new(
            config.template.clone(),
            config.max_context_chars,
            config.context_separator.clone(),
        );
        let chunker = config.chunking.chunker()?;

        debug!(
            chunker = chunker.name(),
            index = %config.index,
            dimension = embedder.dimension(),
            "pipeline ready"
        );

        Ok(Rag {
            embedder,
            retriever,
            answerer,
            composer,
            chunker,
            extractor: self.extractor,
            session,
            config,
        })
    }
}
