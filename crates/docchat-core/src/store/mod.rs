//! Vector storage abstraction for the embedding index.
//!
//! The [`VectorStore`] trait covers the nearest-neighbor half of the index:
//! it holds vectors in insertion slots and ranks them against a query
//! vector. Chunk bookkeeping stays in [`Index`](crate::index::Index), so an
//! approximate store can replace the exact one without touching it.
//!
//! Stores are built once from a complete set of vectors; there is no
//! insert-after-build, update, or delete.

pub mod flat;

use crate::embedding::SimilarityMetric;

/// A ranked match: the slot of a stored vector and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub slot: usize,
    pub score: f32,
}

/// Read-only nearest-neighbor lookup over a fixed set of vectors.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`dims`](VectorStore::dims) | Dimension shared by every stored vector |
/// | [`len`](VectorStore::len) | Number of stored vectors |
/// | [`vector`](VectorStore::vector) | Vector stored in a slot |
/// | [`nearest`](VectorStore::nearest) | Top-`k` slots for a query vector |
pub trait VectorStore: Send + Sync {
    fn dims(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn vector(&self, slot: usize) -> Option<&[f32]>;

    /// Return at most `k` neighbors in descending score order.
    ///
    /// Equal scores keep insertion order, so results are deterministic.
    fn nearest(&self, query: &[f32], k: usize, metric: SimilarityMetric) -> Vec<Neighbor>;
}
