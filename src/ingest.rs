//! Upload ingestion: bytes → scratch files → text → chunks.
//!
//! Each upload gets its own scratch directory; the raw bytes are written
//! there, extracted from disk, and the directory is removed when
//! [`prepare_documents`] returns, whether it succeeded or not.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use docchat_core::chunk::{chunk_document, ChunkingConfig};
use docchat_core::models::{Chunk, DocumentId};
use docchat_core::{RagError, Result};
use serde::Serialize;

use crate::extract::TextExtractor;

/// One file as received from the user.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Original file name; its extension selects the extractor.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping only its file name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// What one document contributed to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub name: String,
    /// Characters of normalized text.
    pub chars: usize,
    pub chunks: usize,
}

/// Chunks ready for embedding, grouped per document in upload order.
#[derive(Debug, Default)]
pub struct PreparedCorpus {
    pub chunks: Vec<Chunk>,
    pub documents: Vec<DocumentSummary>,
    /// Names of byte-identical repeats that were skipped.
    pub duplicates: Vec<String>,
}

/// Clean extracted text before chunking.
///
/// Line endings become `\n`, form feeds (page breaks) become paragraph
/// breaks, NULs are removed and the result is trimmed.
pub fn normalize_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{000C}', "\n\n")
        .replace('\0', "")
        .trim()
        .to_string()
}

/// Extract and chunk every uploaded document.
///
/// # Errors
///
/// - [`RagError::Configuration`] for invalid chunking parameters.
/// - [`RagError::Extraction`] when a document cannot be read, or when no
///   document yields any text.
pub fn prepare_documents(
    docs: &[UploadedDocument],
    chunking: &ChunkingConfig,
    extractor: &dyn TextExtractor,
    temp_root: Option<&Path>,
) -> Result<PreparedCorpus> {
    chunking.validate()?;
    let mut corpus = PreparedCorpus::default();
    if docs.is_empty() {
        return Ok(corpus);
    }

    let scratch = scratch_dir(temp_root)?;
    tracing::debug!(dir = %scratch.path().display(), documents = docs.len(), "staging upload");

    let mut seen: HashSet<DocumentId> = HashSet::new();
    for (position, doc) in docs.iter().enumerate() {
        let id = DocumentId::from_bytes(&doc.bytes);
        if !seen.insert(id.clone()) {
            tracing::info!(document = %doc.name, id = %id, "skipping duplicate upload");
            corpus.duplicates.push(doc.name.clone());
            continue;
        }

        let path = staged_path(scratch.path(), position, &doc.name);
        std::fs::write(&path, &doc.bytes).map_err(|e| RagError::Extraction {
            document: doc.name.clone(),
            message: format!("could not stage upload: {e}"),
        })?;

        let raw = extractor.extract(&path).map_err(|e| RagError::Extraction {
            document: doc.name.clone(),
            message: e.to_string(),
        })?;
        let text = normalize_text(&raw);
        if text.is_empty() {
            tracing::warn!(document = %doc.name, "document contains no extractable text");
        }

        let chunks = chunk_document(&id, &text, chunking)?;
        tracing::debug!(document = %doc.name, chars = text.chars().count(), chunks = chunks.len(), "document chunked");
        corpus.documents.push(DocumentSummary {
            id,
            name: doc.name.clone(),
            chars: text.chars().count(),
            chunks: chunks.len(),
        });
        corpus.chunks.extend(chunks);
    }

    if corpus.chunks.is_empty() {
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        return Err(RagError::Extraction {
            document: names.join(", "),
            message: "no extractable text found in any uploaded document".to_string(),
        });
    }

    Ok(corpus)
}

fn scratch_dir(temp_root: Option<&Path>) -> Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("docchat-upload-");
    let dir = match temp_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    };
    dir.map_err(|e| RagError::Extraction {
        document: "(upload)".to_string(),
        message: format!("could not create scratch directory: {e}"),
    })
}

/// `{position}-{file name}` inside `dir`; directory components are dropped.
fn staged_path(dir: &Path, position: usize, name: &str) -> PathBuf {
    let file_name = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "document".to_string());
    dir.join(format!("{position:03}-{file_name}"))
}
