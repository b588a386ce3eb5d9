//! Token counting.
//!
//! [`TokenCounter`] is the seam the trimmer depends on. [`Tokenizer`] is the
//! production implementation, backed by the `o200k_base` BPE encoding from
//! `tiktoken-rs`. Loading the encoding is expensive, so build one
//! [`Tokenizer`] at startup and share it behind an `Arc`.

use quarry_core::error::TokenizerError;
use tiktoken_rs::CoreBPE;

/// Name of the encoding used by [`Tokenizer::o200k`].
pub const O200K_BASE: &str = "o200k_base";

/// Counts tokens in text.
///
/// Implementations must be deterministic and thread-safe since a single
/// counter is shared by all in-flight requests.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens `text` encodes to. `0` for the empty string.
    fn count_tokens(&self, text: &str) -> usize;
}

/// BPE tokenizer with a fixed encoding.
pub struct Tokenizer {
    bpe: CoreBPE,
    encoding: &'static str,
}

impl Tokenizer {
    /// Load the `o200k_base` encoding.
    pub fn o200k() -> Result<Self, TokenizerError> {
        let bpe = tiktoken_rs::o200k_base().map_err(|e| TokenizerError::LoadFailed {
            encoding: O200K_BASE.into(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            bpe,
            encoding: O200K_BASE,
        })
    }

    /// The encoding scheme name.
    pub fn encoding(&self) -> &'static str {
        self.encoding
    }
}

impl TokenCounter for Tokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        // Special-token text like "<|endoftext|>" is counted as plain text.
        self.bpe.encode_ordinary(text).len()
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("encoding", &self.encoding)
            .finish()
    }
}
