//! # docchat core
//!
//! Pure retrieval-augmented generation logic for docchat: data models,
//! chunking, the embedding index, retrieval policy, prompt assembly, and
//! answer synthesis.
//!
//! This crate performs no filesystem or network I/O of its own. Remote
//! embedding and generation services are reached through the
//! [`embedding::EmbeddingProvider`] and [`generation::GenerationProvider`]
//! traits, which the `docchat` app crate implements over HTTP.
//!
//! ## Pipeline
//!
//! ```text
//! text ─▶ chunk ─▶ Index::build ─▶ Retriever ─▶ ContextAssembler ─▶ AnswerSynthesizer
//!                   (embed once)    (top-k)      (bounded prompt)     (generate)
//! ```

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod models;
pub mod retriever;
pub mod store;

pub use error::{RagError, Result};
