//! Error types for the Quarry domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Quarry operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Structured output recovery ---
    #[error("Recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    // --- Text processing ---
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No usable model backend is configured. Fatal, never retried.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// The model response could not be turned into JSON even after cleaning.
#[derive(Debug, Clone, Error)]
pub enum RecoveryError {
    #[error("Failed to parse response as JSON: {reason}")]
    Parse {
        /// Text exactly as the backend returned it.
        raw: String,
        /// Text after the repair pipeline ran.
        cleaned: String,
        reason: String,
    },
}

impl RecoveryError {
    /// The untouched backend response.
    pub fn raw(&self) -> &str {
        match self {
            Self::Parse { raw, .. } => raw,
        }
    }

    /// The response after heuristic cleaning.
    pub fn cleaned(&self) -> &str {
        match self {
            Self::Parse { cleaned, .. } => cleaned,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("Failed to load encoding {encoding}: {reason}")]
    LoadFailed { encoding: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitterError {
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn recovery_error_keeps_both_texts() {
        let err = RecoveryError::Parse {
            raw: "```json\n{\"a\": 1".into(),
            cleaned: "{\"a\": 1".into(),
            reason: "EOF while parsing an object".into(),
        };
        assert_eq!(err.raw(), "```json\n{\"a\": 1");
        assert_eq!(err.cleaned(), "{\"a\": 1");

        let top: Error = err.into();
        assert!(top.to_string().contains("EOF while parsing"));
    }

    #[test]
    fn splitter_error_names_both_sizes() {
        let err = SplitterError::OverlapTooLarge {
            overlap: 50,
            size: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("50"));
        assert!(msg.contains("10"));
    }
}
