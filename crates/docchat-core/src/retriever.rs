//! Retrieval policy over an [`Index`].
//!
//! A [`Retriever`] fixes how many chunks a question gets (`k`), how vectors
//! are compared ([`SimilarityMetric`]), and how the final set is chosen
//! ([`SearchType`]). It has no state of its own, so the policy can change
//! without touching how vectors are stored.
//!
//! # Search types
//!
//! - **Similarity**: the `k` best-scoring chunks, best first.
//! - **MMR** (maximal marginal relevance): fetch `fetch_k` candidates, then
//!   greedily pick `k` of them, each maximizing
//!   `λ × sim(query, c) − (1 − λ) × max sim(c, already picked)`.
//!   Relevance and redundancy are both measured with cosine similarity;
//!   returned scores are the metric scores against the query.

use crate::embedding::{cosine_similarity, SimilarityMetric};
use crate::error::{RagError, Result};
use crate::index::{Hit, Index};
use crate::models::{Chunk, ScoredChunk};

/// How the final chunk set is chosen from the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SearchType {
    #[default]
    Similarity,
    Mmr {
        /// Candidates fetched before diversification (`>= k`).
        fetch_k: usize,
        /// Relevance weight in `[0, 1]`; `1.0` degenerates to plain similarity.
        lambda: f32,
    },
}

/// Fixed retrieval policy: `k`, metric, and search type.
#[derive(Debug, Clone, PartialEq)]
pub struct Retriever {
    k: usize,
    metric: SimilarityMetric,
    search_type: SearchType,
}

impl Default for Retriever {
    fn default() -> Self {
        Self {
            k: 5,
            metric: SimilarityMetric::Cosine,
            search_type: SearchType::Similarity,
        }
    }
}

impl Retriever {
    pub fn new(k: usize, metric: SimilarityMetric, search_type: SearchType) -> Result<Self> {
        if k == 0 {
            return Err(RagError::Configuration("retrieval.k must be >= 1".to_string()));
        }
        if let SearchType::Mmr { fetch_k, lambda } = search_type {
            if fetch_k < k {
                return Err(RagError::Configuration(format!(
                    "retrieval.fetch_k ({}) must be >= retrieval.k ({})",
                    fetch_k, k
                )));
            }
            if !(0.0..=1.0).contains(&lambda) {
                return Err(RagError::Configuration(
                    "retrieval.mmr_lambda must be in [0.0, 1.0]".to_string(),
                ));
            }
        }
        Ok(Self {
            k,
            metric,
            search_type,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    /// Retrieve chunks with their scores, in selection order.
    pub async fn retrieve_scored(&self, index: &Index, query: &str) -> Result<Vec<ScoredChunk>> {
        match self.search_type {
            SearchType::Similarity => index.query_with(query, self.k, self.metric).await,
            SearchType::Mmr { fetch_k, lambda } => {
                if index.is_empty() {
                    return Ok(Vec::new());
                }
                let query_vec = index.embed_query(query).await?;
                let candidates = index.search_vector(&query_vec, fetch_k, self.metric);
                let picked = mmr_select(&query_vec, &candidates, self.k, lambda);
                Ok(picked.into_iter().map(|i| candidates[i].to_scored()).collect())
            }
        }
    }

    /// Retrieve chunks in selection order, dropping scores.
    pub async fn retrieve(&self, index: &Index, query: &str) -> Result<Vec<Chunk>> {
        Ok(self
            .retrieve_scored(index, query)
            .await?
            .into_iter()
            .map(|s| s.chunk)
            .collect())
    }
}

/// Greedy MMR over `candidates`; returns positions into `candidates`.
fn mmr_select(query: &[f32], candidates: &[Hit<'_>], k: usize, lambda: f32) -> Vec<usize> {
    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c.vector))
        .collect();
    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_value = f32::NEG_INFINITY;
        for (pos, &i) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|&s| cosine_similarity(candidates[i].vector, candidates[s].vector))
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if selected.is_empty() { 0.0 } else { redundancy };
            let value = lambda * relevance[i] - (1.0 - lambda) * redundancy;
            if value > best_value {
                best_value = value;
                best_pos = pos;
            }
        }
        selected.push(remaining.remove(best_pos));
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::{chunk, TableEmbedder};
    use std::sync::Arc;

    async fn index() -> Index {
        let embedder = Arc::new(TableEmbedder::new(
            3,
            &[
                ("paris", vec![1.0, 0.0, 0.0]),
                ("paris again", vec![1.0, 0.0, 0.0]),
                ("berlin", vec![0.8, 0.6, 0.0]),
                ("tokyo", vec![0.0, 1.0, 0.0]),
                ("lima", vec![0.0, 0.0, 1.0]),
                ("q:france", vec![1.0, 0.1, 0.0]),
            ],
        ));
        let chunks = ["paris", "paris again", "berlin", "tokyo", "lima"]
            .iter()
            .enumerate()
            .map(|(i, t)| chunk(t, i))
            .collect();
        Index::build(embedder, chunks, 8).await.unwrap()
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn default_policy() {
        let r = Retriever::default();
        assert_eq!(r.k(), 5);
        assert_eq!(r.metric(), SimilarityMetric::Cosine);
        assert_eq!(r.search_type(), SearchType::Similarity);
    }

    #[test]
    fn rejects_invalid_policies() {
        let sim = SearchType::Similarity;
        assert!(Retriever::new(0, SimilarityMetric::Cosine, sim).is_err());
        let mmr = SearchType::Mmr {
            fetch_k: 2,
            lambda: 0.5,
        };
        assert!(Retriever::new(3, SimilarityMetric::Cosine, mmr).is_err());
        let mmr = SearchType::Mmr {
            fetch_k: 10,
            lambda: 1.5,
        };
        assert!(Retriever::new(3, SimilarityMetric::Cosine, mmr).is_err());
    }

    #[tokio::test]
    async fn similarity_returns_top_k() {
        let index = index().await;
        let r = Retriever::new(2, SimilarityMetric::Cosine, SearchType::Similarity).unwrap();
        let got = r.retrieve(&index, "q:france").await.unwrap();
        assert_eq!(texts(&got), vec!["paris", "paris again"]);
    }

    #[tokio::test]
    async fn mmr_skips_redundant_candidates() {
        let index = index().await;
        let mmr = SearchType::Mmr {
            fetch_k: 3,
            lambda: 0.5,
        };
        let r = Retriever::new(2, SimilarityMetric::Cosine, mmr).unwrap();
        let got = r.retrieve(&index, "q:france").await.unwrap();
        assert_eq!(texts(&got), vec!["paris", "berlin"]);
    }

    #[tokio::test]
    async fn mmr_with_full_relevance_weight_matches_similarity() {
        let index = index().await;
        let mmr = SearchType::Mmr {
            fetch_k: 5,
            lambda: 1.0,
        };
        let r = Retriever::new(3, SimilarityMetric::Cosine, mmr).unwrap();
        let got = r.retrieve(&index, "q:france").await.unwrap();
        assert_eq!(texts(&got), vec!["paris", "paris again", "berlin"]);
    }

    #[tokio::test]
    async fn scored_results_keep_scores() {
        let index = index().await;
        let r = Retriever::default();
        let got = r.retrieve_scored(&index, "q:france").await.unwrap();
        assert_eq!(got.len(), 5);
        assert!(got.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
