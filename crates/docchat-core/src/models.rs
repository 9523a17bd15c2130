//! Core data models that flow through the retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifier of an uploaded document, derived from a digest of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Build an id from the first 16 hex digits of the SHA-256 of `bytes`.
    ///
    /// Byte-identical documents get the same id.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = format!("{:x}", hasher.finalize());
        Self(digest[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier linking a chunk to its vector in the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

/// A passage of one document's normalized text.
///
/// Chunks from one document, concatenated in `sequence_index` order with the
/// configured overlap removed, reconstruct that document's text exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source: DocumentId,
    pub sequence_index: usize,
    pub text: String,
}

/// A chunk paired with its similarity score for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Higher is more similar, whatever the metric.
    pub score: f32,
}

/// One completed question/answer exchange. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub query: String,
    pub answer: String,
    pub completed_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_is_content_derived() {
        let a = DocumentId::from_bytes(b"same bytes");
        let b = DocumentId::from_bytes(b"same bytes");
        let c = DocumentId::from_bytes(b"other bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn chunk_ids_are_unique() {
        assert_ne!(ChunkId::new(), ChunkId::new());
    }

    #[test]
    fn turn_serializes_query_and_answer() {
        let turn = Turn::new("What is it?", "A test.");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["query"], "What is it?");
        assert_eq!(json["answer"], "A test.");
        assert!(json["completed_at"].is_string());
    }
}
