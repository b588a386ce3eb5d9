//! Provider router: selects the model backend to use based on config.
//!
//! Only providers with credentials are registered. Selection prefers the
//! configured provider, then falls back to Gemini, then OpenAI.

use std::collections::HashMap;
use std::sync::Arc;

use quarry_core::error::ProviderError;
use quarry_core::provider::ModelBackend;
use tracing::{debug, info, warn};

use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Order in which registered backends are tried when the preferred one is
/// missing.
const FALLBACK_ORDER: [&str; 2] = ["gemini", "openai"];

/// Holds the configured backends and picks one for requests.
pub struct ProviderRouter {
    backends: HashMap<String, ModelBackend>,
    preferred: String,
}

impl ProviderRouter {
    /// Create a new router with a preferred provider name.
    pub fn new(preferred: impl Into<String>) -> Self {
        Self {
            backends: HashMap::new(),
            preferred: preferred.into(),
        }
    }

    /// Register a backend under a provider name.
    pub fn register(&mut self, name: impl Into<String>, backend: ModelBackend) {
        self.backends.insert(name.into(), backend);
    }

    /// Get a specific backend by provider name.
    pub fn get(&self, name: &str) -> Option<ModelBackend> {
        self.backends.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Pick the backend to use.
    ///
    /// The preferred provider wins when registered; otherwise the first
    /// registered entry of the fallback order. With nothing registered this
    /// is `BackendUnavailable`.
    pub fn select(&self) -> Result<ModelBackend, ProviderError> {
        if let Some(backend) = self.get(&self.preferred) {
            debug!(provider = %self.preferred, model = %backend.model(), "Selected preferred backend");
            return Ok(backend);
        }

        for name in FALLBACK_ORDER {
            if let Some(backend) = self.get(name) {
                info!(
                    preferred = %self.preferred,
                    provider = name,
                    "Preferred backend not configured, falling back"
                );
                return Ok(backend);
            }
        }

        Err(ProviderError::BackendUnavailable(
            "No model initialized. Please check your API keys.".into(),
        ))
    }
}

/// Build backends from configuration.
pub fn build_from_config(config: &quarry_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.provider);
    let generation = &config.generation;

    if !config.has_api_key() {
        warn!("No API key configured for any provider");
    }

    if let Some(api_key) = &config.openai.api_key {
        let provider = Arc::new(OpenAiCompatProvider::new(
            "openai",
            &config.openai.base_url,
            api_key,
        ));
        router.register(
            "openai",
            ModelBackend::new(provider, &config.openai.model)
                .with_temperature(generation.temperature)
                .with_max_tokens(generation.max_tokens),
        );
    }

    if let Some(api_key) = &config.gemini.api_key {
        let provider = Arc::new(GeminiProvider::new(api_key));
        router.register(
            "gemini",
            ModelBackend::new(provider, &config.gemini.model)
                .with_temperature(generation.temperature)
                .with_max_tokens(generation.max_tokens),
        );
    }

    router
}
