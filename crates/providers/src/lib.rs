//! LLM Provider implementations for Quarry.
//!
//! All providers implement the `quarry_core::Provider` trait.
//! The router picks the backend to use from configuration.

pub mod gemini;
pub mod openai_compat;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
