//! Request side of structured output: prompt augmentation.

use quarry_core::error::ProviderError;
use quarry_core::provider::ModelBackend;
use tracing::debug;

use crate::schema::{FieldSchema, SchemaExample};

const INSTRUCTIONS: &str = "IMPORTANT: You must respond with ONLY a valid JSON object. \
Follow these rules strictly:
1. Do not include any explanation, markdown formatting, or additional text
2. The response must be a single JSON object
3. All property names must be in double quotes
4. Use the exact property names as specified
5. The response must match this schema exactly:";

const REMINDER: &str = "Remember: Return ONLY the JSON object, nothing else.";

/// Append JSON-only instructions and the schema example to `prompt`.
pub fn build_structured_prompt(prompt: &str, schema: &FieldSchema) -> String {
    let example = SchemaExample::from_schema(schema).to_pretty_json();
    format!("{prompt}\n\n{INSTRUCTIONS}\n\n{example}\n\n{REMINDER}")
}

/// Send the augmented prompt to `backend` and return the raw reply.
pub async fn request_structured(
    backend: &ModelBackend,
    prompt: &str,
    system: Option<&str>,
    schema: &FieldSchema,
) -> Result<String, ProviderError> {
    let augmented = build_structured_prompt(prompt, schema);
    debug!(
        model = %backend.model(),
        fields = schema.len(),
        "Requesting structured output"
    );
    backend.generate_text(&augmented, system).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quarry_core::message::Message;
    use quarry_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use std::sync::{Arc, Mutex};

    struct EchoProvider {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            let content = request.messages[0].content.clone();
            self.prompts.lock().unwrap().push(content);
            Ok(ProviderResponse {
                message: Message::assistant("{}"),
                model: request.model,
            })
        }
    }

    #[test]
    fn prompt_starts_with_original_and_contains_schema() {
        let schema = FieldSchema::new().field("title", "string");
        let prompt = build_structured_prompt("Name a book.", &schema);

        assert!(prompt.starts_with("Name a book.\n\nIMPORTANT: You must respond with ONLY"));
        assert!(prompt.contains("3. All property names must be in double quotes"));
        assert!(prompt.contains("\"title\": \"(string)\""));
        assert!(prompt.contains("\"example\": \"This is an example of the expected format\""));
        assert!(prompt.ends_with("\n\nRemember: Return ONLY the JSON object, nothing else."));
    }

    #[test]
    fn schema_block_is_pretty_printed() {
        let schema = FieldSchema::new().required("id");
        let prompt = build_structured_prompt("p", &schema);
        assert!(prompt.contains(
            "match this schema exactly:\n\n{\n  \"example\": \
             \"This is an example of the expected format\",\n  \"properties\": {\n    \
             \"id\": \"(required)\"\n  }\n}\n\nRemember"
        ));
    }

    #[tokio::test]
    async fn request_sends_augmented_prompt_with_system() {
        let provider = Arc::new(EchoProvider {
            prompts: Mutex::new(Vec::new()),
        });
        let backend = ModelBackend::new(provider.clone(), "m");
        let schema = FieldSchema::new().field("answer", "short answer");

        let raw = request_structured(&backend, "Why?", Some("Be terse."), &schema)
            .await
            .unwrap();
        assert_eq!(raw, "{}");

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Be terse.\n\nWhy?\n\nIMPORTANT"));
        assert!(prompts[0].contains("(short answer)"));
    }
}
