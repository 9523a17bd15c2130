//! Embedding provider trait and vector similarity.
//!
//! Defines the [`EmbeddingProvider`] trait that every embedding backend
//! implements, plus the [`SimilarityMetric`]s the index can rank by.
//!
//! Concrete providers (OpenAI, Ollama) live in the `docchat` app crate.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{RagError, Result};

/// A remote (or local) service turning text into fixed-dimension vectors.
///
/// The same provider instance is used to build an index and to embed the
/// queries run against it, so both sides share one model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding dimensionality (e.g. `1536`), or `0` if the
    /// provider only learns it from the first response.
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input in input order.
    ///
    /// # Errors
    ///
    /// [`RagError::EmbeddingService`] when the service is unreachable,
    /// rejects the request, or returns malformed output.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(RagError::EmbeddingService(format!(
                "expected 1 vector, got {}",
                vectors.len()
            )));
        }
        Ok(vectors.remove(0))
    }
}

/// How two vectors are compared. Scores are always "higher is closer".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// Cosine of the angle between the vectors, in `[-1, 1]`.
    #[default]
    Cosine,
    /// Raw inner product.
    Dot,
    /// Negated Euclidean (L2) distance.
    Euclidean,
}

impl SimilarityMetric {
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::Dot => dot_product(a, b),
            SimilarityMetric::Euclidean => -euclidean_distance(a, b),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Dot => "dot",
            SimilarityMetric::Euclidean => "euclidean",
        }
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, zero vectors, or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean distance; `f32::INFINITY` for vectors of different lengths.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_euclidean_score_prefers_closer() {
        let q = [0.0, 0.0];
        let near = [1.0, 0.0];
        let far = [3.0, 4.0];
        let m = SimilarityMetric::Euclidean;
        assert!(m.score(&q, &near) > m.score(&q, &far));
        assert!((euclidean_distance(&q, &far) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_is_magnitude_sensitive() {
        let q = [1.0, 0.0];
        let dot = SimilarityMetric::Dot;
        assert!(dot.score(&q, &[2.0, 0.0]) > dot.score(&q, &[1.0, 0.0]));
        assert_eq!(
            SimilarityMetric::Cosine.score(&q, &[2.0, 0.0]),
            SimilarityMetric::Cosine.score(&q, &[1.0, 0.0])
        );
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(SimilarityMetric::default(), SimilarityMetric::Cosine);
        assert_eq!(SimilarityMetric::Euclidean.as_str(), "euclidean");
    }
}
