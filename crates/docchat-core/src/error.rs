//! Error kinds surfaced by the retrieval pipeline.
//!
//! Each variant corresponds to one failure class a caller must be able to
//! tell apart, and each renders a distinct message suitable for showing to
//! an end user unchanged.

use thiserror::Error;

/// Errors produced by chunking, indexing, retrieval, and generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RagError {
    /// Invalid chunking or retrieval parameters. Raised before any external call.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A document could not be turned into text.
    #[error("Could not read document '{document}': {message}")]
    Extraction { document: String, message: String },

    /// The embedding service was unreachable or returned malformed output.
    #[error("Embedding service failed: {0}")]
    EmbeddingService(String),

    /// The text-generation service was unreachable, refused the request, or
    /// returned malformed output.
    #[error("Answer generation failed: {0}")]
    GenerationService(String),

    /// A question was asked before the document index finished building.
    #[error("Documents are not ready yet (session is {state}); upload documents before asking")]
    NotReady { state: String },
}

/// Shorthand for results carrying a [`RagError`].
pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::Configuration(_) => "configuration",
            RagError::Extraction { .. } => "extraction",
            RagError::EmbeddingService(_) => "embedding_service",
            RagError::GenerationService(_) => "generation_service",
            RagError::NotReady { .. } => "not_ready",
        }
    }
}
