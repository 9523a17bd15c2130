//! The embedding index: chunks, their vectors, and nearest-neighbor queries.
//!
//! An [`Index`] is built once from the full set of chunks and is immutable
//! afterwards. Building is all-or-nothing: either every chunk was embedded
//! and the index is returned, or an error is returned and nothing escapes.
//!
//! # Example
//!
//! ```rust,ignore
//! let index = Index::build(embedder, chunks, 64).await?;
//! let hits = index.query("What is the capital of France?", 5).await?;
//! ```

use std::sync::Arc;

use crate::embedding::{EmbeddingProvider, SimilarityMetric};
use crate::error::{RagError, Result};
use crate::models::{Chunk, ScoredChunk};
use crate::store::flat::FlatStore;
use crate::store::VectorStore;

/// A ranked match borrowed from the index.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub slot: usize,
    pub score: f32,
    pub chunk: &'a Chunk,
    pub vector: &'a [f32],
}

impl Hit<'_> {
    pub fn to_scored(&self) -> ScoredChunk {
        ScoredChunk {
            chunk: self.chunk.clone(),
            score: self.score,
        }
    }
}

/// Chunks plus vectors, queried with the same embedding model that built them.
pub struct Index {
    chunks: Vec<Chunk>,
    store: Box<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("chunks", &self.chunks.len())
            .field("dims", &self.store.dims())
            .field("model", &self.embedder.model_name())
            .finish()
    }
}

impl Index {
    /// Embed every chunk in batches of `batch_size` and build the index.
    ///
    /// Chunks keep their given order; that order is the tie-break for
    /// equal scores at query time.
    ///
    /// # Errors
    ///
    /// - [`RagError::Configuration`] if `batch_size` is zero.
    /// - [`RagError::EmbeddingService`] if any batch fails, returns the wrong
    ///   number of vectors, or returns vectors of the wrong dimension.
    pub async fn build(
        embedder: Arc<dyn EmbeddingProvider>,
        chunks: Vec<Chunk>,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(RagError::Configuration(
                "embedding.batch_size must be > 0".to_string(),
            ));
        }

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = embedder.embed(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(RagError::EmbeddingService(format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }

        let dims = match embedder.dims() {
            0 => vectors.first().map(|v| v.len()).unwrap_or(0),
            d => d,
        };
        let store = FlatStore::new(dims, vectors)?;

        Ok(Self {
            chunks,
            store: Box::new(store),
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.store.dims()
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// All indexed chunks in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Embed query text with the index's own model.
    ///
    /// Makes exactly one embedding call.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.embedder.embed_one(text).await?;
        if vector.len() != self.dims() {
            return Err(RagError::EmbeddingService(format!(
                "query embedding has dimension {}, index uses {}",
                vector.len(),
                self.dims()
            )));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(RagError::EmbeddingService(
                "query embedding contains non-finite values".to_string(),
            ));
        }
        Ok(vector)
    }

    /// Rank stored chunks against an already-embedded query.
    pub fn search_vector(&self, query: &[f32], k: usize, metric: SimilarityMetric) -> Vec<Hit<'_>> {
        self.store
            .nearest(query, k, metric)
            .into_iter()
            .filter_map(|n| {
                Some(Hit {
                    slot: n.slot,
                    score: n.score,
                    chunk: self.chunks.get(n.slot)?,
                    vector: self.store.vector(n.slot)?,
                })
            })
            .collect()
    }

    /// Top-`k` chunks for `text` by cosine similarity, best first.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        self.query_with(text, k, SimilarityMetric::Cosine).await
    }

    /// Top-`k` chunks for `text` under `metric`, best first.
    ///
    /// Returns every chunk when the index holds fewer than `k`. An empty
    /// index or `k == 0` returns nothing without calling the embedding
    /// service.
    pub async fn query_with(
        &self,
        text: &str,
        k: usize,
        metric: SimilarityMetric,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.embed_query(text).await?;
        Ok(self
            .search_vector(&query, k, metric)
            .iter()
            .map(Hit::to_scored)
            .collect())
    }
}
