//! One conversation over one set of uploaded documents.
//!
//! ```text
//! EMPTY ──upload──▶ BUILDING ──ok──▶ READY ──ask──▶ READY (+1 turn)
//!   ▲                  │
//!   └──────fail────────┘            READY ──reset──▶ EMPTY
//! ```
//!
//! The index is built exactly once per session. A later upload while
//! `READY` leaves the index untouched and reports
//! [`UploadOutcome::AlreadyIndexed`]; call [`Session::reset`] first to
//! index a different document set.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use docchat_core::chunk::ChunkingConfig;
use docchat_core::context::ContextAssembler;
use docchat_core::embedding::EmbeddingProvider;
use docchat_core::generation::{AnswerSynthesizer, GenerationProvider};
use docchat_core::index::Index;
use docchat_core::models::Turn;
use docchat_core::retriever::Retriever;
use docchat_core::{RagError, Result};
use serde::Serialize;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::extract::{panic_message, FileExtractor, TextExtractor};
use crate::generation::create_generator;
use crate::ingest::{prepare_documents, DocumentSummary, PreparedCorpus, UploadedDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Empty,
    Building,
    Ready,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Empty => "empty",
            SessionState::Building => "building",
            SessionState::Ready => "ready",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`Session::upload`].
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Built(BuildReport),
    /// The session already has an index; nothing changed.
    AlreadyIndexed,
    /// The upload contained no documents; nothing changed.
    NoDocuments,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    pub documents: Vec<DocumentSummary>,
    pub duplicates: Vec<String>,
    pub chunks: usize,
    pub elapsed_ms: u128,
    pub built_at: DateTime<Utc>,
}

/// Pipeline parameters, validated once up front.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub chunking: ChunkingConfig,
    pub batch_size: usize,
    pub retriever: Retriever,
    pub assembler: ContextAssembler,
    pub temperature: f32,
    pub temp_dir: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            batch_size: 64,
            retriever: Retriever::default(),
            assembler: ContextAssembler::default(),
            temperature: AnswerSynthesizer::DEFAULT_TEMPERATURE,
            temp_dir: None,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.chunking.validate()?;
        let retriever = config
            .retrieval
            .retriever()
            .map_err(|e| RagError::Configuration(e.to_string()))?;
        let assembler = ContextAssembler::new(
            config.context.max_context_tokens,
            config.context.history_turns,
        )?;
        Ok(Self {
            chunking: config.chunking,
            batch_size: config.embedding.batch_size,
            retriever,
            assembler,
            temperature: config.generation.temperature,
            temp_dir: config.ingest.temp_dir.clone(),
        })
    }
}

/// The external collaborators a session talks to.
#[derive(Clone)]
pub struct Services {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub generator: Arc<dyn GenerationProvider>,
    pub extractor: Arc<dyn TextExtractor>,
}

impl Services {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            embedder,
            generator,
            extractor: Arc::new(FileExtractor),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            create_provider(&config.embedding)?,
            create_generator(&config.generation)?,
        ))
    }
}

pub struct Session {
    settings: SessionSettings,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<dyn TextExtractor>,
    synthesizer: AnswerSynthesizer,
    state: SessionState,
    index: Option<Index>,
    history: Vec<Turn>,
    sources: Vec<DocumentSummary>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("index", &self.index)
            .field("turns", &self.history.len())
            .finish()
    }
}

/// Puts the session back to `EMPTY` unless the build completed.
///
/// Covers both error returns and a build future dropped mid-flight.
struct BuildGuard<'a> {
    state: &'a mut SessionState,
    completed: bool,
}

impl<'a> BuildGuard<'a> {
    fn start(state: &'a mut SessionState) -> Self {
        *state = SessionState::Building;
        Self {
            state,
            completed: false,
        }
    }

    fn complete(mut self) {
        *self.state = SessionState::Ready;
        self.completed = true;
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            *self.state = SessionState::Empty;
        }
    }
}

impl Session {
    pub fn new(settings: SessionSettings, services: Services) -> Result<Self> {
        settings.chunking.validate()?;
        if settings.batch_size == 0 {
            return Err(RagError::Configuration(
                "embedding.batch_size must be > 0".to_string(),
            ));
        }
        let synthesizer = AnswerSynthesizer::new(services.generator, settings.temperature)?;
        Ok(Self {
            settings,
            embedder: services.embedder,
            extractor: services.extractor,
            synthesizer,
            state: SessionState::Empty,
            index: None,
            history: Vec::new(),
            sources: Vec::new(),
        })
    }

    /// Build a session with the providers named in `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let settings = SessionSettings::from_config(config)?;
        let services = Services::from_config(config)?;
        Ok(Self::new(settings, services)?)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Completed turns, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Documents behind the current index.
    pub fn sources(&self) -> &[DocumentSummary] {
        &self.sources
    }

    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Index `docs` if the session has no index yet.
    ///
    /// On any failure the session is left `EMPTY` with no index, history
    /// or sources.
    pub async fn upload(&mut self, docs: &[UploadedDocument]) -> Result<UploadOutcome> {
        match self.state {
            SessionState::Ready => {
                tracing::warn!(
                    documents = docs.len(),
                    "index already built for this session; ignoring upload"
                );
                return Ok(UploadOutcome::AlreadyIndexed);
            }
            SessionState::Building => {
                return Err(RagError::NotReady {
                    state: self.state.to_string(),
                });
            }
            SessionState::Empty => {}
        }
        if docs.is_empty() {
            return Ok(UploadOutcome::NoDocuments);
        }

        let started = Instant::now();
        let guard = BuildGuard::start(&mut self.state);

        let corpus = prepare_off_thread(
            docs.to_vec(),
            self.settings.chunking,
            Arc::clone(&self.extractor),
            self.settings.temp_dir.clone(),
        )
        .await?;
        let chunk_count = corpus.chunks.len();
        tracing::info!(
            documents = corpus.documents.len(),
            chunks = chunk_count,
            model = %self.embedder.model_name(),
            "building index"
        );

        let index = Index::build(
            Arc::clone(&self.embedder),
            corpus.chunks,
            self.settings.batch_size,
        )
        .await?;

        self.index = Some(index);
        self.sources = corpus.documents.clone();
        guard.complete();

        let elapsed_ms = started.elapsed().as_millis();
        tracing::info!(chunks = chunk_count, elapsed_ms, "index ready");
        Ok(UploadOutcome::Built(BuildReport {
            documents: corpus.documents,
            duplicates: corpus.duplicates,
            chunks: chunk_count,
            elapsed_ms,
            built_at: Utc::now(),
        }))
    }

    /// Answer `query` from the indexed documents.
    ///
    /// The turn is recorded only when an answer was produced.
    pub async fn ask(&mut self, query: &str) -> Result<String> {
        let index = match (self.state, self.index.as_ref()) {
            (SessionState::Ready, Some(index)) => index,
            (state, _) => {
                return Err(RagError::NotReady {
                    state: state.to_string(),
                })
            }
        };

        let started = Instant::now();
        let passages = self.settings.retriever.retrieve_scored(index, query).await?;
        let prompt = self
            .settings
            .assembler
            .assemble_with_history(&passages, query, &self.history);
        tracing::debug!(
            retrieved = passages.len(),
            included = prompt.included,
            dropped = prompt.dropped,
            replayed = prompt.replayed,
            prompt_chars = prompt.text.chars().count(),
            "prompt assembled"
        );

        let answer = self.synthesizer.synthesize(&prompt.text).await?;
        tracing::debug!(
            model = %self.synthesizer.model_name(),
            elapsed_ms = started.elapsed().as_millis(),
            "answer generated"
        );

        self.history.push(Turn::new(query, answer.clone()));
        Ok(answer)
    }

    /// Drop the index, history and sources, returning to `EMPTY`.
    pub fn reset(&mut self) {
        self.index = None;
        self.history.clear();
        self.sources.clear();
        self.state = SessionState::Empty;
    }

    /// History as pretty-printed JSON.
    pub fn transcript_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.history)
    }
}

/// Run extraction and chunking on the blocking pool; they read files and
/// parse PDFs synchronously.
async fn prepare_off_thread(
    docs: Vec<UploadedDocument>,
    chunking: ChunkingConfig,
    extractor: Arc<dyn TextExtractor>,
    temp_dir: Option<PathBuf>,
) -> Result<PreparedCorpus> {
    tokio::task::spawn_blocking(move || {
        prepare_documents(&docs, &chunking, extractor.as_ref(), temp_dir.as_deref())
    })
    .await
    .map_err(|e| {
        let message = if e.is_panic() {
            format!("extraction crashed: {}", panic_message(e.into_panic().as_ref()))
        } else {
            "extraction was cancelled".to_string()
        };
        RagError::Extraction {
            document: "(upload)".to_string(),
            message,
        }
    })?
}
