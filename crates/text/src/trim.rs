//! Token-budget prompt trimming.
//!
//! Shrinks a prompt until its token count fits a context window. Each round
//! estimates a character budget from the token overflow, cuts the prompt with
//! the [`RecursiveTextSplitter`] so the cut lands on the coarsest boundary
//! available, then measures again. The character estimate is approximate, so
//! several rounds may be needed.
//!
//! Every round strictly shortens the working text, and anything that would go
//! below `min_chunk_size` characters returns that many leading characters
//! instead. If the rounds run out first, the longest character prefix that
//! fits is found by binary search. Trimming never fails and never expands the prompt; every result is
//! a prefix of the input.

use std::sync::Arc;

use quarry_config::TrimConfig;
use tracing::{debug, warn};

use crate::splitter::RecursiveTextSplitter;
use crate::tokenizer::TokenCounter;

pub const DEFAULT_CONTEXT_SIZE: usize = 128_000;
pub const MIN_CHUNK_SIZE: usize = 140;
pub const CHARS_PER_TOKEN: usize = 3;
pub const MAX_ITERATIONS: usize = 64;

#[derive(Clone)]
pub struct PromptTrimmer {
    counter: Arc<dyn TokenCounter>,
    context_size: usize,
    min_chunk_size: usize,
    chars_per_token: usize,
    max_iterations: usize,
}

impl PromptTrimmer {
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            counter,
            context_size: DEFAULT_CONTEXT_SIZE,
            min_chunk_size: MIN_CHUNK_SIZE,
            chars_per_token: CHARS_PER_TOKEN,
            max_iterations: MAX_ITERATIONS,
        }
    }

    pub fn from_config(
        counter: Arc<dyn TokenCounter>,
        trim: &TrimConfig,
        context_size: usize,
    ) -> Self {
        Self::new(counter)
            .with_context_size(context_size)
            .with_min_chunk_size(trim.min_chunk_size)
            .with_chars_per_token(trim.chars_per_token)
            .with_max_iterations(trim.max_iterations)
    }

    /// Default budget used by [`PromptTrimmer::trim`].
    pub fn with_context_size(mut self, context_size: usize) -> Self {
        self.context_size = context_size;
        self
    }

    pub fn with_min_chunk_size(mut self, min_chunk_size: usize) -> Self {
        self.min_chunk_size = min_chunk_size.max(1);
        self
    }

    pub fn with_chars_per_token(mut self, chars_per_token: usize) -> Self {
        self.chars_per_token = chars_per_token.max(1);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn context_size(&self) -> usize {
        self.context_size
    }

    /// Trim `prompt` to the configured context size.
    pub fn trim(&self, prompt: &str) -> String {
        self.trim_to(prompt, self.context_size)
    }

    /// Trim `prompt` so it encodes to at most `context_size` tokens, or to
    /// its first `min_chunk_size` characters when that is not reachable.
    pub fn trim_to(&self, prompt: &str, context_size: usize) -> String {
        let mut current = prompt;

        for iteration in 0..self.max_iterations {
            if current.is_empty() {
                return String::new();
            }

            let length = self.counter.count_tokens(current);
            if length <= context_size {
                return current.to_string();
            }

            let overflow = length - context_size;
            let chars = current.chars().count();
            let chunk_size = chars.saturating_sub(overflow.saturating_mul(self.chars_per_token));

            debug!(
                iteration,
                tokens = length,
                overflow,
                chars,
                chunk_size,
                "Prompt exceeds context size, trimming"
            );

            if chunk_size < self.min_chunk_size {
                return char_prefix(current, self.min_chunk_size).to_string();
            }

            let candidate = RecursiveTextSplitter::without_overlap(chunk_size)
                .chunks(current)
                .next()
                .unwrap_or(current);

            current = if candidate.len() == current.len() {
                // No boundary made progress; force a hard cut.
                char_prefix(current, chunk_size)
            } else {
                candidate
            };
        }

        if self.counter.count_tokens(current) <= context_size {
            return current.to_string();
        }

        warn!(
            max_iterations = self.max_iterations,
            context_size, "Prompt trimming did not converge, cutting by characters"
        );
        self.longest_fitting_prefix(current, context_size).to_string()
    }

    /// Binary search for the longest character prefix of `text` that fits
    /// `context_size`, never shorter than `min_chunk_size` characters.
    fn longest_fitting_prefix<'a>(&self, text: &'a str, context_size: usize) -> &'a str {
        let ends: Vec<usize> = text
            .char_indices()
            .skip(1)
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let prefix = |chars: usize| &text[..ends[chars - 1]];

        // `lo` is the floor or a known fit, `hi` a known miss.
        let mut lo = self.min_chunk_size;
        let mut hi = ends.len();
        if lo >= hi || self.counter.count_tokens(prefix(lo)) > context_size {
            return char_prefix(text, self.min_chunk_size);
        }

        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.counter.count_tokens(prefix(mid)) <= context_size {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        prefix(lo)
    }
}

impl std::fmt::Debug for PromptTrimmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptTrimmer")
            .field("context_size", &self.context_size)
            .field("min_chunk_size", &self.min_chunk_size)
            .field("chars_per_token", &self.chars_per_token)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

/// Trim with default tuning.
pub fn trim_prompt(counter: Arc<dyn TokenCounter>, prompt: &str, context_size: usize) -> String {
    PromptTrimmer::new(counter).trim_to(prompt, context_size)
}

/// The first `n` characters of `text` (all of it when shorter).
fn char_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
