//! # docchat
//!
//! Chat with your documents. Upload PDFs, Office files or plain text,
//! ask questions, and get answers grounded in the uploaded content.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────────┐
//! │  Upload  │──▶│ Extract+Chunk │──▶│ Embedding Index │
//! │ PDF/DOCX │   │   (ingest)    │   │   (in memory)   │
//! └──────────┘   └──────────────┘   └───────┬────────┘
//!                                           │ top-k
//!                 ┌──────────┐      ┌───────▼────────┐
//!                 │  Answer  │◀─────│ Prompt assembly │
//!                 │ (LLM)    │      │   + question    │
//!                 └──────────┘      └────────────────┘
//! ```
//!
//! The pure pipeline (chunking, index, retrieval, prompt assembly) lives in
//! the `docchat-core` crate. This crate adds configuration, HTTP providers,
//! document extraction, the session state machine and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | OpenAI / Ollama embedding providers |
//! | [`generation`] | OpenAI / Ollama chat providers |
//! | [`extract`] | PDF, DOCX, PPTX and text extraction |
//! | [`ingest`] | Upload staging, normalization and chunking |
//! | [`session`] | Upload → index → ask lifecycle |
//! | [`chat`] | `chat` and `ask` commands |
//! | [`inspect`] | Offline `chunks` command |

pub mod chat;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generation;
mod http;
pub mod ingest;
pub mod inspect;
pub mod session;
