//! Configuration loading, validation, and management for Quarry.
//!
//! Loads configuration from `~/.quarry/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! Recognized environment variables:
//! - `LLM_PROVIDER`: preferred backend (`gemini` or `openai`)
//! - `CONTEXT_SIZE`: default token budget for prompt trimming
//! - `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL`
//! - `GEMINI_API_KEY`, `GEMINI_MODEL`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.quarry/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Preferred LLM provider
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Default context window, in tokens, used when trimming prompts
    #[serde(default = "default_context_size")]
    pub context_size: usize,

    /// OpenAI (or OpenAI-compatible) backend
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Google Gemini backend
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Prompt trimming tunables
    #[serde(default)]
    pub trim: TrimConfig,

    /// Sampling settings applied to every generation request
    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_context_size() -> usize {
    128_000
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_openai_model() -> String {
    "gpt-3.5-turbo".into()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".into()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .finish()
    }
}

/// Tunables for the prompt trimmer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimConfig {
    /// Hard floor, in characters, below which trimming stops estimating
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,

    /// Characters assumed per excess token when estimating a cut
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// Safety cap on estimate-and-retry rounds
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_min_chunk_size() -> usize {
    140
}
fn default_chars_per_token() -> usize {
    3
}
fn default_max_iterations() -> usize {
    64
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: default_min_chunk_size(),
            chars_per_token: default_chars_per_token(),
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.quarry/config.toml),
    /// then apply environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// API keys from the environment only fill in keys the file left unset.
    /// Empty values count as unset. A `CONTEXT_SIZE` that is not a positive
    /// integer is ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = var("LLM_PROVIDER") {
            self.provider = provider;
        }

        if let Some(raw) = var("CONTEXT_SIZE") {
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => self.context_size = size,
                _ => tracing::warn!(value = %raw, "Ignoring invalid CONTEXT_SIZE"),
            }
        }

        if self.openai.api_key.is_none() {
            self.openai.api_key = var("OPENAI_API_KEY");
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            self.openai.base_url = base_url;
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.openai.model = model;
        }

        if self.gemini.api_key.is_none() {
            self.gemini.api_key = var("GEMINI_API_KEY");
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.gemini.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quarry")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context_size == 0 {
            return Err(ConfigError::ValidationError(
                "context_size must be greater than 0".into(),
            ));
        }

        if self.trim.min_chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "trim.min_chunk_size must be greater than 0".into(),
            ));
        }

        if self.trim.chars_per_token == 0 {
            return Err(ConfigError::ValidationError(
                "trim.chars_per_token must be greater than 0".into(),
            ));
        }

        if self.trim.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "trim.max_iterations must be greater than 0".into(),
            ));
        }

        if let Some(t) = self.generation.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "generation.temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        Ok(())
    }

    /// Check if any backend has credentials.
    pub fn has_api_key(&self) -> bool {
        self.openai.api_key.is_some() || self.gemini.api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            context_size: default_context_size(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            trim: TrimConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.context_size, 128_000);
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.trim.min_chunk_size, 140);
        assert_eq!(config.trim.chars_per_token, 3);
        assert!(config.validate().is_ok());
        assert!(!config.has_api_key());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.context_size, config.context_size);
    }

    #[test]
    fn env_overrides_provider_models_and_context() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("LLM_PROVIDER", "openai"),
            ("CONTEXT_SIZE", "8000"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
        ]));

        assert_eq!(config.provider, "openai");
        assert_eq!(config.context_size, 8000);
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.openai.base_url, "http://localhost:8080/v1");
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.gemini.model, "gemini-1.5-pro");
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn invalid_context_size_falls_back() {
        for raw in ["abc", "0", "-5", ""] {
            let mut config = AppConfig::default();
            config.apply_env(env(&[("CONTEXT_SIZE", raw)]));
            assert_eq!(config.context_size, 128_000, "value {raw:?}");
        }
    }

    #[test]
    fn file_api_key_wins_over_env() {
        let mut config = AppConfig::default();
        config.gemini.api_key = Some("from-file".into());
        config.apply_env(env(&[("GEMINI_API_KEY", "from-env")]));
        assert_eq!(config.gemini.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn empty_env_key_is_unset() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("OPENAI_API_KEY", "")]));
        assert!(config.openai.api_key.is_none());
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.generation.temperature = Some(5.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_trim_settings_rejected() {
        let mut config = AppConfig::default();
        config.trim.chars_per_token = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.context_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.provider, "gemini");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
provider = "openai"
context_size = 32000

[openai]
api_key = "sk-file"
model = "gpt-4o"

[trim]
chars_per_token = 4
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.context_size, 32_000);
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.trim.chars_per_token, 4);
        assert_eq!(config.trim.min_chunk_size, 140);
        assert!(config.has_api_key());
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "context_size = \"lots\"").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_redacts_keys() {
        let mut config = AppConfig::default();
        config.openai.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
