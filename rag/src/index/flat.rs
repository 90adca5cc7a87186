//! Exact brute-force vector index.

use crate::error::Result;
use crate::types::{Embedding, Neighbor};

use super::{IndexKind, VectorIndex, check_dimension, check_search, exact_search};

/// Exact nearest-neighbor index over squared Euclidean distance.
///
/// Every search scores all rows in parallel with rayon, which is plenty for the few
/// thousand chunks a single document produces.
///
/// # Example
///
/// ```rust
/// use docqa_rag::index::{FlatIndex, VectorIndex};
///
/// let mut index = FlatIndex::new(2);
/// index.build(vec![vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
///
/// let hits = index.search(&[0.9, 0.9], 1).unwrap();
/// assert_eq!(hits[0].row, 1);
/// ```
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Embedding>,
    built: bool,
}

impl FlatIndex {
    /// Creates an unbuilt index for vectors of `dimension` elements.
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            built: false,
        }
    }
}

impl VectorIndex for FlatIndex {
    fn build(&mut self, embeddings: Vec<Embedding>) -> Result<()> {
        for embedding in &embeddings {
            check_dimension(self.dimension, embedding)?;
        }
        self.vectors = embeddings;
        self.built = true;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        check_search(self.built, self.dimension, query, k)?;
        Ok(exact_search(&self.vectors, query, k))
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
        IndexKind::Flat
    }
}
