//! # Quarry Core
//!
//! Domain types, traits, and error definitions shared by every Quarry crate.
//!
//! The model backend is defined here as a trait ([`Provider`]) so that the
//! trimming and structured-output layers never depend on a concrete LLM
//! client. [`ModelBackend`] binds a provider to the model name it should be
//! called with and exposes the single capability the rest of the workspace
//! needs: prompt in, raw text out.

pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result};
pub use message::{Message, Role};
pub use provider::{ModelBackend, Provider, ProviderRequest, ProviderResponse};
