//! HNSW-based vector index using instant-distance.

use instant_distance::{Builder, HnswMap, Point, Search};

use crate::error::Result;
use crate::types::{Embedding, Neighbor};

use super::{
    IndexKind, VectorIndex, check_dimension, check_search, exact_search, rank, squared_l2,
};

/// Candidates the graph yields per search. Requests for at least this many rows are
/// answered by the exact scan.
const SEARCH_WIDTH: usize = 100;

/// A point wrapper for instant-distance that stores an embedding vector.
#[derive(Clone, Debug)]
struct EmbeddingPoint {
    embedding: Embedding,
}

impl Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        squared_l2(&self.embedding, &other.embedding)
    }
}

/// HNSW-based vector index for approximate nearest neighbor search.
///
/// The graph is built once per [`build`](VectorIndex::build). Searches asking for at
/// least as many rows as the index holds, or more rows than one graph search yields, skip
/// the graph and scan exhaustively, so every search returns `min(k, len)` rows. Candidates returned by the graph are re-ranked
/// with the same distance-then-row order as [`FlatIndex`](super::FlatIndex).
pub struct HnswIndex {
    dimension: usize,
    vectors: Vec<Embedding>,
    graph: Option<HnswMap<EmbeddingPoint, usize>>,
    built: bool,
}

impl std::fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswIndex")
            .field("dimension", &self.dimension)
            .field("len", &self.vectors.len())
            .field("built", &self.built)
            .finish_non_exhaustive()
    }
}

impl HnswIndex {
    /// Creates an unbuilt index for vectors of `dimension` elements.
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            graph: None,
            built: false,
        }
    }
}

impl VectorIndex for HnswIndex {
    fn build(&mut self, embeddings: Vec<Embedding>) -> Result<()> {
        for embedding in &embeddings {
            check_dimension(self.dimension, embedding)?;
        }

        self.graph = if embeddings.is_empty() {
            None
        } else {
            let points: Vec<EmbeddingPoint> = embeddings
                .iter()
                .map(|embedding| EmbeddingPoint {
                    embedding: embedding.clone(),
                })
                .collect();
            let rows: Vec<usize> = (0..embeddings.len()).collect();
            Some(Builder::default().ef_search(SEARCH_WIDTH).build(points, rows))
        };
        self.vectors = embeddings;
        self.built = true;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        check_search(self.built, self.dimension, query, k)?;

        let Some(graph) = self
            .graph
            .as_ref()
            .filter(|_| k < self.vectors.len() && k < SEARCH_WIDTH)
        else {
            return Ok(exact_search(&self.vectors, query, k));
        };

        let query_point = EmbeddingPoint {
            embedding: query.to_vec(),
        };
        let mut search = Search::default();
        let mut neighbors: Vec<Neighbor> = graph
            .search(&query_point, &mut search)
            .map(|candidate| Neighbor {
                row: *candidate.value,
                distance: candidate.distance,
            })
            .collect();
        rank(&mut neighbors, k);
        Ok(neighbors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn is_built(&self) -> bool {
        self.built
    }

    fn vectors(&self) -> &[Embedding] {
        &self.vectors
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Hnsw
    }
}
