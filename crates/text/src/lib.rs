//! Text utilities for fitting prompts into a model's context window.
//!
//! - [`tokenizer`] counts BPE tokens (`o200k_base`).
//! - [`splitter`] cuts text into character-bounded chunks, preferring
//!   paragraph, line, sentence and word boundaries in that order.
//! - [`trim`] combines both to shrink a prompt until it fits a token budget.

pub mod splitter;
pub mod tokenizer;
pub mod trim;

pub use splitter::{RecursiveTextSplitter, SplitterConfig};
pub use tokenizer::{TokenCounter, Tokenizer};
pub use trim::{PromptTrimmer, trim_prompt};
