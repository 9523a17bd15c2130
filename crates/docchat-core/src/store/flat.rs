//! Exact brute-force [`VectorStore`].
//!
//! Scores the query against every stored vector. Fine for the size of a
//! single interactive document set (tens of thousands of chunks).

use crate::embedding::SimilarityMetric;
use crate::error::{RagError, Result};

use super::{Neighbor, VectorStore};

/// Vectors kept contiguously in insertion order.
#[derive(Debug, Clone, Default)]
pub struct FlatStore {
    dims: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatStore {
    /// Build a store from a complete set of vectors.
    ///
    /// # Errors
    ///
    /// [`RagError::EmbeddingService`] if any vector's length differs from
    /// `dims` or contains a non-finite component; such vectors can only come
    /// from a misbehaving embedding service.
    pub fn new(dims: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        for (slot, v) in vectors.iter().enumerate() {
            if v.len() != dims {
                return Err(RagError::EmbeddingService(format!(
                    "vector {} has dimension {}, expected {}",
                    slot,
                    v.len(),
                    dims
                )));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(RagError::EmbeddingService(format!(
                    "vector {} contains non-finite values",
                    slot
                )));
            }
        }
        Ok(Self { dims, vectors })
    }
}

impl VectorStore for FlatStore {
    fn dims(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn vector(&self, slot: usize) -> Option<&[f32]> {
        self.vectors.get(slot).map(|v| v.as_slice())
    }

    fn nearest(&self, query: &[f32], k: usize, metric: SimilarityMetric) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(slot, v)| Neighbor {
                slot,
                score: metric.score(query, v),
            })
            .collect();
        // Stable sort: ties stay in slot order.
        neighbors.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(k);
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FlatStore {
        FlatStore::new(
            2,
            vec![
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![0.7, 0.7],
                vec![1.0, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let err = FlatStore::new(2, vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, RagError::EmbeddingService(_)));
    }

    #[test]
    fn rejects_non_finite_components() {
        let err = FlatStore::new(2, vec![vec![f32::NAN, 0.0]]).unwrap_err();
        assert!(matches!(err, RagError::EmbeddingService(_)));
    }

    #[test]
    fn nearest_is_descending_with_stable_ties() {
        let hits = store().nearest(&[1.0, 0.0], 4, SimilarityMetric::Cosine);
        let slots: Vec<usize> = hits.iter().map(|n| n.slot).collect();
        assert_eq!(slots, vec![0, 3, 2, 1]);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn nearest_truncates_to_k_and_handles_small_stores() {
        let s = store();
        assert_eq!(s.nearest(&[0.0, 1.0], 2, SimilarityMetric::Cosine).len(), 2);
        assert_eq!(s.nearest(&[0.0, 1.0], 10, SimilarityMetric::Cosine).len(), 4);
        assert!(s.nearest(&[0.0, 1.0], 0, SimilarityMetric::Cosine).is_empty());
    }

    #[test]
    fn vector_lookup_by_slot() {
        let s = store();
        assert_eq!(s.vector(1), Some(&[0.0f32, 1.0][..]));
        assert_eq!(s.vector(9), None);
        assert_eq!(s.dims(), 2);
        assert!(!s.is_empty());
    }
}
