//! The loaded corpus and its lifecycle.
//!
//! A [`CorpusSession`] owns at most one [`Corpus`]: the chunks of the current document
//! and the vector index built from them. Ingests build a new corpus off to the side and
//! swap it in with a single write, so chunks and index rows can never disagree.
//!
//! ```text
//! Empty ──ingest──▶ Building ──ok──▶ Ready ──ingest──▶ Building ──ok──▶ Ready
//!                      │                                  │
//!                      └──err──▶ Empty                    └──err──▶ Ready (previous corpus)
//! ```

use std::fmt;
use std::sync::Arc;

use async_lock::{Mutex, MutexGuard};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::IngestPolicy;
use crate::error::{RagError, Result};
use crate::fingerprint::chunks_fingerprint;
use crate::index::VectorIndex;
use crate::types::{Chunk, CorpusInfo, RetrievalResult, RetrievedChunk};

/// The chunks of one document together with the index built over their embeddings.
///
/// Row `i` of the index always belongs to the chunk with id `i`.
#[derive(Debug)]
pub struct Corpus {
    chunks: Vec<Chunk>,
    index: Box<dyn VectorIndex>,
    fingerprint: u64,
}

impl Corpus {
    /// Pairs chunks with a built index.
    ///
    /// # Errors
    /// - [`RagError::EmptyInput`] when there are no chunks
    /// - [`RagError::IndexNotBuilt`] when the index has not been built
    /// - [`RagError::InternalConsistency`] when chunk ids are not `0..n` or the index
    ///   row count differs from the chunk count
    pub fn new(chunks: Vec<Chunk>, index: Box<dyn VectorIndex>) -> Result<Self> {
        if chunks.is_empty() {
            return Err(RagError::EmptyInput);
        }
        if !index.is_built() {
            return Err(RagError::IndexNotBuilt);
        }
        if index.len() != chunks.len() {
            return Err(RagError::InternalConsistency(format!(
                "index holds {} rows for {} chunks",
                index.len(),
                chunks.len()
            )));
        }
        if let Some((position, chunk)) = chunks
            .iter()
            .enumerate()
            .find(|(position, chunk)| chunk.id() != *position)
        {
            return Err(RagError::InternalConsistency(format!(
                "chunk at position {position} has id {}",
                chunk.id()
            )));
        }

        let fingerprint = chunks_fingerprint(&chunks);
        Ok(Self {
            chunks,
            index,
            fingerprint,
        })
    }

    /// The chunks, by id.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The vector index.
    #[must_use]
    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    /// Number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Always `false`; a corpus holds at least one chunk.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Fingerprint over the chunk texts.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Summary of this corpus.
    #[must_use]
    pub fn info(&self) -> CorpusInfo {
        CorpusInfo {
            chunks: self.chunks.len(),
            dimension: self.index.dimension(),
            fingerprint: self.fingerprint,
            index: self.index.kind(),
        }
    }

    /// Finds the `k` chunks closest to an embedded query.
    ///
    /// # Errors
    /// Propagates index search errors. A row with no matching chunk is reported as
    /// [`RagError::InternalConsistency`].
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        self.index
            .search(query, k)?
            .into_iter()
            .map(|neighbor| {
                let chunk = self.chunks.get(neighbor.row).ok_or_else(|| {
                    RagError::InternalConsistency(format!(
                        "index returned row {} but only {} chunks exist",
                        neighbor.row,
                        self.chunks.len()
                    ))
                })?;
                Ok(RetrievedChunk {
                    chunk: chunk.clone(),
                    distance: neighbor.distance,
                })
            })
            .collect()
    }
}

/// Lifecycle state of a [`CorpusSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No document has been loaded.
    Empty,
    /// An ingest is in progress; queries are refused.
    Building,
    /// A corpus is loaded and queryable.
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::Building => f.write_str("building"),
            Self::Ready => f.write_str("ready"),
        }
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    building: bool,
    corpus: Option<Arc<Corpus>>,
}

/// Shared handle to the currently loaded corpus.
///
/// Clones share the same state. Readers take an `Arc` snapshot of the corpus, so a
/// search that started before a swap finishes against the corpus it started with.
#[derive(Clone, Default)]
pub struct CorpusSession {
    inner: Arc<RwLock<SessionInner>>,
    ingest: Arc<Mutex<()>>,
}

impl fmt::Debug for CorpusSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorpusSession")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CorpusSession {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        let inner = self.inner.read();
        if inner.building {
            SessionState::Building
        } else if inner.corpus.is_some() {
            SessionState::Ready
        } else {
            SessionState::Empty
        }
    }

    /// Returns the queryable corpus.
    ///
    /// # Errors
    /// Returns [`RagError::NoCorpus`] unless the session is [`SessionState::Ready`].
    pub fn current(&self) -> Result<Arc<Corpus>> {
        let inner = self.inner.read();
        if inner.building {
            return Err(RagError::NoCorpus);
        }
        inner.corpus.clone().ok_or(RagError::NoCorpus)
    }

    /// Summary of the queryable corpus, if any.
    #[must_use]
    pub fn info(&self) -> Option<CorpusInfo> {
        self.current().ok().map(|corpus| corpus.info())
    }

    /// Unloads the corpus. Returns `true` if one was loaded.
    ///
    /// An ingest already in progress is unaffected and will still install its corpus.
    pub fn clear(&self) -> bool {
        let removed = self.inner.write().corpus.take().is_some();
        if removed {
            info!("corpus unloaded");
        }
        removed
    }

    /// Starts an ingest, moving the session to [`SessionState::Building`].
    ///
    /// Only one ingest runs at a time. Under [`IngestPolicy::Reject`] a second ingest
    /// fails immediately; under [`IngestPolicy::Queue`] it waits for the first to finish.
    ///
    /// # Errors
    /// Returns [`RagError::Busy`] when another ingest is running and `policy` rejects.
    pub async fn begin_ingest(&self, policy: IngestPolicy) -> Result<IngestGuard<'_>> {
        let permit = match policy {
            IngestPolicy::Reject => self.ingest.try_lock().ok_or(RagError::Busy)?,
            IngestPolicy::Queue => self.ingest.lock().await,
        };
        self.inner.write().building = true;
        debug!("ingest started");
        Ok(IngestGuard {
            session: self,
            _permit: permit,
            finished: false,
        })
    }
}

/// An in-progress ingest.
///
/// Dropping the guard without calling [`commit`](IngestGuard::commit) rolls the session
/// back, leaving the previous corpus (if any) queryable again.
#[must_use = "dropping the guard rolls the ingest back"]
pub struct IngestGuard<'a> {
    session: &'a CorpusSession,
    _permit: MutexGuard<'a, ()>,
    finished: bool,
}

impl fmt::Debug for IngestGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestGuard")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl IngestGuard<'_> {
    /// Installs `corpus` as the session's corpus and marks the session ready.
    pub fn commit(mut self, corpus: Corpus) -> Arc<Corpus> {
        let corpus = Arc::new(corpus);
        {
            let mut inner = self.session.inner.write();
            inner.corpus = Some(Arc::clone(&corpus));
            inner.building = false;
        }
        self.finished = true;
        corpus
    }

    /// Abandons the ingest, restoring the previous state.
    pub fn rollback(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if !self.finished {
            self.session.inner.write().building = false;
            self.finished = true;
            debug!("ingest rolled back");
        }
    }
}

impl Drop for IngestGuard<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
