//! Prompt assembly: retrieved passages plus the question under fixed instructions.
//!
//! The instructions confine the model to the supplied context, ask for a
//! plain greeting (and no context) when the user only says hello, and ask
//! for any links present in the context to be repeated verbatim at the end
//! of the answer and never invented.
//!
//! The context section is bounded by a character budget derived from a
//! token budget (4 chars ≈ 1 token). When the passages do not fit, the
//! lowest-scoring passage is dropped first until they do, but at least one
//! passage is always kept when any were retrieved. Replayed history turns
//! share the same budget: they get whatever the passages leave, newest
//! turn first, and a turn that does not fit ends the replay.

use crate::error::{RagError, Result};
use crate::models::{ScoredChunk, Turn};

/// Approximate characters-per-token ratio used for budgeting.
const CHARS_PER_TOKEN: usize = 4;

/// Separator placed between passages in the context section.
const PASSAGE_SEPARATOR: &str = "\n\n";

const INSTRUCTIONS: &str = "\
You are a helpful assistant answering questions about the user's documents.
The user may ask anything from a single keyword to a detailed question.

Instructions:
- Answer ONLY from the context below. Do not make up information or speculate.
- Give a clear, concise and direct answer based solely on the context.
- If the question is just a greeting (like \"hi\" or \"hello\"), reply with a short friendly greeting and do not mention the context.
- If the context contains links (such as videos or articles), repeat them verbatim at the end of your answer. Never provide a link that does not appear in the context.";

/// The rendered prompt and how the context budget was spent.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    pub text: String,
    /// Passages that made it into the context section.
    pub included: usize,
    /// Passages dropped to stay within the budget.
    pub dropped: usize,
    /// History turns replayed above the question.
    pub replayed: usize,
}

/// Builds bounded prompts from retrieved passages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextAssembler {
    max_context_chars: usize,
    history_turns: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            max_context_chars: 6000 * CHARS_PER_TOKEN,
            history_turns: 0,
        }
    }
}

impl ContextAssembler {
    /// `max_context_tokens` bounds the context section; `history_turns` is
    /// how many recent turns to replay above the question (0 disables).
    pub fn new(max_context_tokens: usize, history_turns: usize) -> Result<Self> {
        if max_context_tokens == 0 {
            return Err(RagError::Configuration(
                "context.max_context_tokens must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            max_context_chars: max_context_tokens.saturating_mul(CHARS_PER_TOKEN),
            history_turns,
        })
    }

    pub fn with_max_context_chars(mut self, chars: usize) -> Self {
        self.max_context_chars = chars.max(1);
        self
    }

    pub fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }

    pub fn history_turns(&self) -> usize {
        self.history_turns
    }

    /// Render the prompt for `query` from passages in retrieval order.
    pub fn assemble(&self, chunks: &[ScoredChunk], query: &str) -> String {
        self.assemble_with_history(chunks, query, &[]).text
    }

    /// Render the prompt, replaying up to `history_turns` of `history`.
    pub fn assemble_with_history(
        &self,
        chunks: &[ScoredChunk],
        query: &str,
        history: &[Turn],
    ) -> AssembledPrompt {
        let kept = self.fit_to_budget(chunks);
        let context = kept
            .iter()
            .map(|&i| chunks[i].chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR);

        let remaining = self
            .max_context_chars
            .saturating_sub(context.chars().count());
        let turns = self.fit_history(history, remaining);
        let mut conversation = String::new();
        if !turns.is_empty() {
            conversation.push_str("Conversation so far:\n");
            for turn in &turns {
                conversation.push_str(turn);
            }
            conversation.push('\n');
        }

        let text = format!(
            "{INSTRUCTIONS}\n\nContext from the documents:\n<context>\n{context}\n</context>\n\n{conversation}User's question:\n{query}\n"
        );

        AssembledPrompt {
            text,
            included: kept.len(),
            dropped: chunks.len() - kept.len(),
            replayed: turns.len(),
        }
    }

    /// Rendered turns from the history window that fit in `budget` chars,
    /// oldest first.
    fn fit_history(&self, history: &[Turn], mut budget: usize) -> Vec<String> {
        let window = &history[history.len().saturating_sub(self.history_turns)..];
        let mut turns = Vec::with_capacity(window.len());
        for turn in window.iter().rev() {
            let rendered = format!("User: {}\nAssistant: {}\n", turn.query, turn.answer);
            let len = rendered.chars().count();
            if len > budget {
                break;
            }
            budget -= len;
            turns.push(rendered);
        }
        turns.reverse();
        turns
    }

    /// Positions of the passages that fit, in their original order.
    fn fit_to_budget(&self, chunks: &[ScoredChunk]) -> Vec<usize> {
        let lengths: Vec<usize> = chunks.iter().map(|c| c.chunk.text.chars().count()).collect();
        let mut kept: Vec<usize> = (0..chunks.len()).collect();

        let context_len = |kept: &[usize]| -> usize {
            let text: usize = kept.iter().map(|&i| lengths[i]).sum();
            text + PASSAGE_SEPARATOR.len() * kept.len().saturating_sub(1)
        };

        while kept.len() > 1 && context_len(&kept) > self.max_context_chars {
            let mut worst = 0;
            for pos in 1..kept.len() {
                if chunks[kept[pos]].score <= chunks[kept[worst]].score {
                    worst = pos;
                }
            }
            kept.remove(worst);
        }
        kept
    }
}
