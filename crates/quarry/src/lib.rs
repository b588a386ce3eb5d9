//! # Quarry
//!
//! Token-aware prompt trimming and structured JSON output on top of
//! free-text LLM backends.
//!
//! Build a [`Quarry`] once from [`AppConfig`] and share it:
//!
//! ```no_run
//! # async fn run() -> quarry::Result<()> {
//! use quarry::{FieldSchema, Quarry};
//!
//! let quarry = Quarry::load()?;
//! let prompt = quarry.trim_prompt("...a very long document...");
//! let schema = FieldSchema::new().field("summary", "one sentence");
//! let value: serde_json::Value = quarry.generate_structured(&prompt, None, &schema).await?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod context;

pub use context::Quarry;
pub use quarry_config::AppConfig;
pub use quarry_core::{Error, ModelBackend, Provider, ProviderError, Result};
pub use quarry_structured::{FieldSchema, SchemaExample, StructuredGenerator};
pub use quarry_text::{PromptTrimmer, RecursiveTextSplitter, SplitterConfig, TokenCounter, Tokenizer};

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` with `verbose` and `info`
/// without. Does nothing if a subscriber is already installed.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .try_init();
}
