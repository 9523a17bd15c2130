//! `docchat chunks`: offline extraction and chunking report for one file.

use std::path::Path;

use anyhow::{Context, Result};
use docchat_core::chunk::{chunk_document, ChunkingConfig};
use docchat_core::models::DocumentId;

use crate::extract::{FileExtractor, TextExtractor};
use crate::ingest::normalize_text;

/// Chunk statistics for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkStats {
    pub id: DocumentId,
    pub chars: usize,
    pub chunks: usize,
    pub min_chars: usize,
    pub max_chars: usize,
}

pub fn chunk_stats(path: &Path, chunking: &ChunkingConfig) -> Result<ChunkStats> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let raw = FileExtractor
        .extract(path)
        .with_context(|| format!("Could not read document '{}'", path.display()))?;
    let text = normalize_text(&raw);
    let id = DocumentId::from_bytes(&bytes);
    let chunks = chunk_document(&id, &text, chunking)?;
    let sizes: Vec<usize> = chunks.iter().map(|c| c.text.chars().count()).collect();

    Ok(ChunkStats {
        id,
        chars: text.chars().count(),
        chunks: chunks.len(),
        min_chars: sizes.iter().copied().min().unwrap_or(0),
        max_chars: sizes.iter().copied().max().unwrap_or(0),
    })
}

pub fn run_chunks(path: &Path, chunking: &ChunkingConfig) -> Result<()> {
    let stats = chunk_stats(path, chunking)?;
    println!("{}", path.display());
    println!("  id:         {}", stats.id);
    println!("  characters: {}", format_number(stats.chars));
    println!(
        "  chunks:     {} (size {}, overlap {})",
        format_number(stats.chunks),
        chunking.chunk_size,
        chunking.overlap
    );
    if stats.chunks > 0 {
        println!(
            "  chunk size: min {}, max {}",
            format_number(stats.min_chars),
            format_number(stats.max_chars)
        );
    }
    Ok(())
}

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn stats_for_hard_cut_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "a".repeat(2500)).unwrap();
        let stats = chunk_stats(&path, &ChunkingConfig::default()).unwrap();
        assert_eq!(stats.chars, 2500);
        assert_eq!(stats.chunks, 3);
        assert_eq!((stats.min_chars, stats.max_chars), (900, 1000));
    }

    #[test]
    fn empty_file_has_no_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.md");
        std::fs::write(&path, "").unwrap();
        let stats = chunk_stats(&path, &ChunkingConfig::default()).unwrap();
        assert_eq!((stats.chars, stats.chunks), (0, 0));
    }
}
