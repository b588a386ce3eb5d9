//! The shared context: one tokenizer and one model backend per process.

use std::sync::Arc;

use quarry_config::AppConfig;
use quarry_core::provider::ModelBackend;
use quarry_core::{Error, Result};
use quarry_structured::{FieldSchema, StructuredGenerator};
use quarry_text::{PromptTrimmer, TokenCounter, Tokenizer};
use serde::de::DeserializeOwned;
use tracing::info;

/// Trimming and structured generation over a selected backend.
///
/// Cheap to clone; the tokenizer and the HTTP client are shared.
#[derive(Debug, Clone)]
pub struct Quarry {
    trimmer: PromptTrimmer,
    generator: StructuredGenerator,
}

impl Quarry {
    pub fn new(trimmer: PromptTrimmer, backend: ModelBackend) -> Self {
        Self {
            trimmer,
            generator: StructuredGenerator::new(backend),
        }
    }

    /// Load configuration from disk and environment, then build.
    pub fn load() -> Result<Self> {
        let config = AppConfig::load().map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        Self::from_config(&config)
    }

    /// Load the `o200k_base` tokenizer and select a backend.
    ///
    /// Fails with `BackendUnavailable` when no provider has an API key.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let backend = quarry_providers::build_from_config(config).select()?;
        let counter: Arc<dyn TokenCounter> = Arc::new(Tokenizer::o200k()?);
        Ok(Self::with_counter(config, counter, backend))
    }

    /// Build from config with an explicit token counter and backend.
    pub fn with_counter(
        config: &AppConfig,
        counter: Arc<dyn TokenCounter>,
        backend: ModelBackend,
    ) -> Self {
        let trimmer = PromptTrimmer::from_config(counter, &config.trim, config.context_size);
        info!(
            provider = %backend.provider_name(),
            model = %backend.model(),
            context_size = config.context_size,
            "Quarry initialized"
        );
        Self::new(trimmer, backend)
    }

    pub fn backend(&self) -> &ModelBackend {
        self.generator.backend()
    }

    pub fn trimmer(&self) -> &PromptTrimmer {
        &self.trimmer
    }

    /// Trim to the configured context size.
    pub fn trim_prompt(&self, prompt: &str) -> String {
        self.trimmer.trim(prompt)
    }

    /// Trim to an explicit token budget.
    pub fn trim_prompt_to(&self, prompt: &str, context_size: usize) -> String {
        self.trimmer.trim_to(prompt, context_size)
    }

    /// Request an object shaped like `schema` and recover it as `T`.
    ///
    /// The prompt is sent as given; trim it first if it may not fit.
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: Option<&str>,
        schema: &FieldSchema,
    ) -> Result<T> {
        self.generator.generate(prompt, system, schema).await
    }
}
