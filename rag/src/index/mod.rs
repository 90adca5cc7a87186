//! Vector index implementations.
//!
//! This module provides the [`VectorIndex`] trait, the exact [`FlatIndex`], and the
//! graph-based [`HnswIndex`] for larger documents.
//!
//! Both indexes rank by squared Euclidean distance and break distance ties by the lower
//! row, so repeated searches over the same vectors always return the same rows in the
//! same order.

mod flat;
mod hnsw;

pub use flat::FlatIndex;
pub use hnsw::HnswIndex;

use std::{fmt, str::FromStr};

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::types::{Embedding, Neighbor};

/// Trait for vector index implementations.
///
/// An index holds a fixed set of vectors addressed by row. [`build`](VectorIndex::build)
/// replaces the whole set at once; there is no incremental insert.
pub trait VectorIndex: Send + Sync + fmt::Debug {
    /// Builds the index over exactly `embeddings`, replacing any previous content.
    ///
    /// Row `i` of the index is `embeddings[i]`. On error the index keeps its previous
    /// content.
    ///
    /// # Errors
    /// Returns [`RagError::DimensionMismatch`] if any vector has the wrong length.
    fn build(&mut self, embeddings: Vec<Embedding>) -> Result<()>;

    /// Returns the `min(k, len)` rows closest to `query`, closest first.
    ///
    /// # Errors
    /// - [`RagError::IndexNotBuilt`] before the first successful build
    /// - [`RagError::InvalidArgument`] when `k` is zero
    /// - [`RagError::DimensionMismatch`] when the query has the wrong length
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Returns the embedding dimension.
    fn dimension(&self) -> usize;

    /// Returns the number of indexed vectors.
    fn len(&self) -> usize;

    /// Returns `true` if the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`build`](VectorIndex::build) has succeeded.
    fn is_built(&self) -> bool;

    /// The indexed vectors, by row.
    fn vectors(&self) -> &[Embedding];

    /// Which implementation this is.
    fn kind(&self) -> IndexKind;
}

/// Selects the vector index implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exhaustive exact search.
    #[default]
    Flat,
    /// Hierarchical navigable small world graph.
    Hnsw,
}

impl IndexKind {
    /// Creates an empty, unbuilt index of this kind.
    #[must_use]
    pub fn create(self, dimension: usize) -> Box<dyn VectorIndex> {
        match self {
            Self::Flat => Box::new(FlatIndex::new(dimension)),
            Self::Hnsw => Box::new(HnswIndex::new(dimension)),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Hnsw => f.write_str("hnsw"),
        }
    }
}

impl FromStr for IndexKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" | "exact" => Ok(Self::Flat),
            "hnsw" | "ann" => Ok(Self::Hnsw),
            other => Err(RagError::InvalidArgument(format!(
                "unknown index kind `{other}` (expected `flat` or `hnsw`)"
            ))),
        }
    }
}

/// Squared Euclidean distance.
#[must_use]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(lhs, rhs)| {
            let diff = lhs - rhs;
            diff * diff
        })
        .sum()
}

pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(RagError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}

pub(crate) fn check_search(built: bool, dimension: usize, query: &[f32], k: usize) -> Result<()> {
    if !built {
        return Err(RagError::IndexNotBuilt);
    }
    if k == 0 {
        return Err(RagError::InvalidArgument("k must be at least 1".into()));
    }
    check_dimension(dimension, query)
}

/// Ranks neighbors by distance, then row, and keeps the first `k`.
pub(crate) fn rank(neighbors: &mut Vec<Neighbor>, k: usize) {
    neighbors.par_sort_unstable_by_key(|n| (OrderedFloat(n.distance), n.row));
    neighbors.truncate(k);
}

/// Exhaustive scan over `vectors`.
pub(crate) fn exact_search(vectors: &[Embedding], query: &[f32], k: usize) -> Vec<Neighbor> {
    let mut neighbors: Vec<Neighbor> = vectors
        .par_iter()
        .enumerate()
        .map(|(row, vector)| Neighbor {
            row,
            distance: squared_l2(vector, query),
        })
        .collect();
    rank(&mut neighbors, k);
    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_kind_parses_its_display_form() {
        for kind in [IndexKind::Flat, IndexKind::Hnsw] {
            assert_eq!(kind.to_string().parse::<IndexKind>().unwrap(), kind);
        }
        assert_eq!(" HNSW ".parse::<IndexKind>().unwrap(), IndexKind::Hnsw);
        assert!(matches!(
            "faiss".parse::<IndexKind>(),
            Err(RagError::InvalidArgument(_))
        ));
    }

    #[test]
    fn squared_distance() {
        assert!((squared_l2(&[1.0, 2.0], &[4.0, 6.0]) - 25.0).abs() < f32::EPSILON);
        assert!(squared_l2(&[0.5, 0.5], &[0.5, 0.5]).abs() < f32::EPSILON);
    }

    #[test]
    fn ranking_breaks_ties_by_row() {
        let mut neighbors = vec![
            Neighbor {
                row: 3,
                distance: 1.0,
            },
            Neighbor {
                row: 1,
                distance: 1.0,
            },
            Neighbor {
                row: 2,
                distance: 0.5,
            },
        ];
        rank(&mut neighbors, 3);
        let rows: Vec<usize> = neighbors.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![2, 1, 3]);
    }

    #[test]
    fn kind_creates_unbuilt_index() {
        for kind in [IndexKind::Flat, IndexKind::Hnsw] {
            let index = kind.create(8);
            assert_eq!(index.kind(), kind);
            assert_eq!(index.dimension(), 8);
            assert!(!index.is_built());
            assert!(index.is_empty());
        }
    }

    #[test]
    fn kind_display() {
        assert_eq!(IndexKind::Flat.to_string(), "flat");
        assert_eq!(IndexKind::Hnsw.to_string(), "hnsw");
    }
}
