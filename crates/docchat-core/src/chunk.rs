//! Overlapping, separator-aware text chunker.
//!
//! Splits normalized document text into passages of at most `chunk_size`
//! characters, where each passage after the first repeats the last
//! `overlap` characters of its predecessor. Lengths are measured in
//! Unicode scalar values, never bytes, so multi-byte text is never cut
//! inside a character.
//!
//! # Algorithm
//!
//! 1. If the remaining text fits in `chunk_size`, emit it and stop.
//! 2. Otherwise look for a cut point inside the window, trying separators
//!    from the largest unit down: paragraph (`\n\n`), sentence (`. `, `! `,
//!    `? ` or a line break), word (any whitespace). The latest matching
//!    position wins.
//! 3. Cut points closer to the window start than `max(overlap + 1,
//!    chunk_size / 2)` are ignored, so every chunk makes real progress.
//! 4. If no separator qualifies, cut hard at `chunk_size` characters.
//! 5. The next chunk starts `overlap` characters before the cut.
//!
//! Because chunks are exact slices of the input, stripping the first
//! `overlap` characters from every chunk but the first and concatenating
//! them reconstructs the input (see [`reconstruct`]).
//!
//! # Example
//!
//! ```rust
//! use docchat_core::chunk::{split_text, reconstruct};
//!
//! let text = "First paragraph.\n\nSecond paragraph that is a bit longer.";
//! let pieces = split_text(text, 30, 5).unwrap();
//! assert!(pieces.len() > 1);
//! assert_eq!(reconstruct(&pieces, 5), text);
//! ```

use serde::Deserialize;

use crate::error::{RagError, Result};
use crate::models::{Chunk, ChunkId, DocumentId};

/// Chunking parameters, both measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ChunkingConfig {
    /// Target (maximum) chunk length.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_overlap() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot make progress.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunking.chunk_size must be > 0".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Separator classes, largest unit first.
#[derive(Debug, Clone, Copy)]
enum Separator {
    Paragraph,
    Sentence,
    Word,
}

const HIERARCHY: [Separator; 3] = [Separator::Paragraph, Separator::Sentence, Separator::Word];

impl Separator {
    /// Whether a chunk ending just before `cut` ends on this separator.
    fn ends_at(self, chars: &[char], cut: usize) -> bool {
        let last = chars[cut - 1];
        let prev = if cut >= 2 { Some(chars[cut - 2]) } else { None };
        match self {
            Separator::Paragraph => last == '\n' && prev == Some('\n'),
            Separator::Sentence => {
                last == '\n'
                    || (last.is_whitespace() && matches!(prev, Some('.') | Some('!') | Some('?')))
            }
            Separator::Word => last.is_whitespace(),
        }
    }
}

/// Split `text` into overlapping passages.
///
/// # Guarantees
///
/// - Empty text yields no passages.
/// - Text of at most `chunk_size` characters yields exactly one passage.
/// - Every passage has at most `chunk_size` characters.
/// - Consecutive passages share exactly `overlap` characters.
///
/// # Errors
///
/// [`RagError::Configuration`] if `chunk_size` is zero or `overlap >= chunk_size`.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    ChunkingConfig {
        chunk_size,
        overlap,
    }
    .validate()?;

    if text.is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = chars.len();

    let mut pieces = Vec::new();
    let mut start = 0usize;
    loop {
        if total - start <= chunk_size {
            pieces.push(text[offsets[start]..].to_string());
            break;
        }
        let cut = find_cut(&chars, start, chunk_size, overlap);
        pieces.push(text[offsets[start]..offsets[cut]].to_string());
        start = cut - overlap;
    }

    Ok(pieces)
}

/// Choose where the chunk starting at `start` ends (exclusive, in chars).
fn find_cut(chars: &[char], start: usize, chunk_size: usize, overlap: usize) -> usize {
    let limit = start + chunk_size;
    let floor = start + (overlap + 1).max(chunk_size / 2);

    for separator in HIERARCHY {
        if let Some(cut) = (floor..=limit)
            .rev()
            .find(|&cut| separator.ends_at(chars, cut))
        {
            return cut;
        }
    }
    limit
}

/// Chunk one document's text into [`Chunk`]s with contiguous sequence indices.
pub fn chunk_document(
    source: &DocumentId,
    text: &str,
    config: &ChunkingConfig,
) -> Result<Vec<Chunk>> {
    let pieces = split_text(text, config.chunk_size, config.overlap)?;
    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(index, piece)| make_chunk(source, index, piece))
        .collect())
}

/// Undo [`split_text`]: drop the overlap from every passage but the first.
pub fn reconstruct<S: AsRef<str>>(pieces: &[S], overlap: usize) -> String {
    let mut out = String::new();
    for (i, piece) in pieces.iter().enumerate() {
        let piece = piece.as_ref();
        if i == 0 {
            out.push_str(piece);
        } else {
            out.extend(piece.chars().skip(overlap));
        }
    }
    out
}

fn make_chunk(source: &DocumentId, index: usize, text: String) -> Chunk {
    Chunk {
        id: ChunkId::new(),
        source: source.clone(),
        sequence_index: index,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    fn first_chars(s: &str, n: usize) -> String {
        s.chars().take(n).collect()
    }

    fn last_chars(s: &str, n: usize) -> String {
        let len = char_len(s);
        s.chars().skip(len.saturating_sub(n)).collect()
    }

    fn prose(sentences: usize) -> String {
        (0..sentences)
            .map(|i| {
                let para = if i % 7 == 6 { "\n\n" } else { " " };
                format!("Sentence number {} talks about topic {}.{}", i, i % 5, para)
            })
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", 1000, 200).unwrap().is_empty());
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let pieces = split_text("Hello, world!", 1000, 200).unwrap();
        assert_eq!(pieces, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn overlap_not_smaller_than_chunk_size_is_rejected() {
        let err = split_text("abc", 100, 100).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        let err = split_text("abc", 100, 150).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        let err = split_text("abc", 0, 0).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn invalid_config_rejected_even_for_empty_text() {
        assert!(split_text("", 10, 10).is_err());
    }

    #[test]
    fn hard_cut_2500_chars_gives_three_chunks() {
        let text = "abcdefghij".repeat(250);
        let pieces = split_text(&text, 1000, 200).unwrap();
        assert_eq!(pieces.len(), 3);
        assert_eq!(char_len(&pieces[0]), 1000);
        assert_eq!(char_len(&pieces[1]), 1000);
        assert_eq!(char_len(&pieces[2]), 900);
        let rebuilt = reconstruct(&pieces, 200);
        assert_eq!(rebuilt.len(), 2500);
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn round_trip_reconstructs_prose() {
        let text = prose(120);
        for (size, overlap) in [(1000, 200), (300, 50), (80, 0), (64, 63)] {
            let pieces = split_text(&text, size, overlap).unwrap();
            assert_eq!(reconstruct(&pieces, overlap), text, "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn chunks_respect_size_bound() {
        let text = prose(200);
        let pieces = split_text(&text, 250, 40).unwrap();
        for p in &pieces {
            assert!(char_len(p) <= 250, "chunk too long: {}", char_len(p));
        }
    }

    #[test]
    fn adjacent_chunks_share_overlap() {
        let text = prose(150);
        let overlap = 60;
        let pieces = split_text(&text, 400, overlap).unwrap();
        assert!(pieces.len() > 2);
        for pair in pieces.windows(2) {
            assert_eq!(last_chars(&pair[0], overlap), first_chars(&pair[1], overlap));
        }
    }

    #[test]
    fn prefers_paragraph_then_sentence_then_word() {
        let text = "Alpha beta gamma.\n\nDelta epsilon. Zeta eta theta iota kappa";
        let pieces = split_text(text, 30, 0).unwrap();
        assert_eq!(pieces[0], "Alpha beta gamma.\n\n");

        let text = "One two three. Four five six seven eight nine ten";
        let pieces = split_text(text, 25, 0).unwrap();
        assert_eq!(pieces[0], "One two three. ");

        let text = "one two three four five six seven";
        let pieces = split_text(text, 12, 0).unwrap();
        assert_eq!(pieces[0], "one two ");
    }

    #[test]
    fn multibyte_text_is_never_split_inside_a_char() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘".repeat(5);
        let pieces = split_text(&text, 17, 4).unwrap();
        assert!(pieces.iter().all(|p| char_len(p) <= 17));
        assert_eq!(reconstruct(&pieces, 4), text);
    }

    #[test]
    fn chunk_document_assigns_contiguous_indices() {
        let source = DocumentId::from("doc-1");
        let config = ChunkingConfig::new(100, 20).unwrap();
        let chunks = chunk_document(&source, &prose(40), &config).unwrap();
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.sequence_index, i);
            assert_eq!(c.source, source);
        }
    }

    #[test]
    fn deterministic_pieces() {
        let text = prose(60);
        assert_eq!(
            split_text(&text, 200, 30).unwrap(),
            split_text(&text, 200, 30).unwrap()
        );
    }

    #[test]
    fn default_config_matches_documented_values() {
        let c = ChunkingConfig::default();
        assert_eq!((c.chunk_size, c.overlap), (1000, 200));
        assert!(c.validate().is_ok());
    }
}
