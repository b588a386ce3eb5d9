//! Structured generation: augment, call the backend, recover.

use quarry_core::Result;
use quarry_core::provider::ModelBackend;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::protocol::request_structured;
use crate::recovery::recover;
use crate::schema::FieldSchema;

/// Produces typed values from a free-text model backend.
///
/// There is no retry: a backend failure or an unrecoverable reply is
/// returned to the caller as is.
#[derive(Debug, Clone)]
pub struct StructuredGenerator {
    backend: ModelBackend,
}

impl StructuredGenerator {
    pub fn new(backend: ModelBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &ModelBackend {
        &self.backend
    }

    /// Ask for an object shaped like `schema` and parse the reply as `T`.
    pub async fn generate<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: Option<&str>,
        schema: &FieldSchema,
    ) -> Result<T> {
        generate_structured(&self.backend, prompt, system, schema).await
    }

    /// Same as [`generate`](Self::generate) but returns untyped JSON.
    pub async fn generate_value(
        &self,
        prompt: &str,
        system: Option<&str>,
        schema: &FieldSchema,
    ) -> Result<serde_json::Value> {
        self.generate(prompt, system, schema).await
    }
}

/// One structured round trip against `backend`.
pub async fn generate_structured<T: DeserializeOwned>(
    backend: &ModelBackend,
    prompt: &str,
    system: Option<&str>,
    schema: &FieldSchema,
) -> Result<T> {
    let raw = request_structured(backend, prompt, system, schema).await?;
    let value = recover(&raw)?;
    info!(
        provider = %backend.provider_name(),
        model = %backend.model(),
        "Structured output recovered"
    );
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quarry_core::error::{Error, ProviderError};
    use quarry_core::message::Message;
    use quarry_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with a fixed text, or fails every call.
    struct FixedProvider {
        reply: std::result::Result<String, ProviderError>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(error: ProviderError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(error),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = self.reply.clone()?;
            Ok(ProviderResponse {
                message: Message::assistant(text),
                model: request.model,
            })
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Queries {
        queries: Vec<String>,
    }

    fn schema() -> FieldSchema {
        FieldSchema::new().field("queries", "List of search queries")
    }

    #[tokio::test]
    async fn fenced_reply_becomes_typed_value() {
        let provider = FixedProvider::replying("```json\n{queries: [\"a\", \"b\"],}\n```");
        let generator = StructuredGenerator::new(ModelBackend::new(provider.clone(), "m"));

        let result: Queries = generator.generate("Plan searches", None, &schema()).await.unwrap();
        assert_eq!(result.queries, vec!["a", "b"]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn untyped_value() {
        let provider = FixedProvider::replying("{\"queries\": []}");
        let generator = StructuredGenerator::new(ModelBackend::new(provider, "m"));
        let value = generator.generate_value("p", None, &schema()).await.unwrap();
        assert_eq!(value, json!({"queries": []}));
    }

    #[tokio::test]
    async fn prose_reply_is_recovery_error() {
        let provider = FixedProvider::replying("I could not decide on any queries.");
        let generator = StructuredGenerator::new(ModelBackend::new(provider.clone(), "m"));

        let err = generator
            .generate::<Queries>("p", None, &schema())
            .await
            .unwrap_err();
        match err {
            Error::Recovery(e) => assert_eq!(e.raw(), "I could not decide on any queries."),
            other => panic!("Expected recovery error, got: {other:?}"),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrong_shape_is_recovery_error() {
        let provider = FixedProvider::replying("{\"answer\": 42}");
        let generator = StructuredGenerator::new(ModelBackend::new(provider, "m"));
        let err = generator
            .generate::<Queries>("p", None, &schema())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Recovery(_)));
    }

    #[tokio::test]
    async fn backend_failure_propagates_without_retry() {
        let provider = FixedProvider::failing(ProviderError::Network("connection reset".into()));
        let generator = StructuredGenerator::new(ModelBackend::new(provider.clone(), "m"));

        let err = generator
            .generate::<Queries>("p", None, &schema())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Network(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
