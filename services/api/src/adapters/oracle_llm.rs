//! services/api/src/adapters/oracle_llm.rs
//!
//! This module contains the adapter for the translation oracle, an OpenAI-compatible
//! chat completion endpoint (Gemini by default). It implements the
//! `TranslationOracle` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};
use translation_workflow_core::error::is_auth_rejection;
use translation_workflow_core::ports::{PortError, PortResult, TranslationOracle};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TranslationOracle` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiOracleAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiOracleAdapter {
    /// Creates a new `OpenAiOracleAdapter` with the default model used when a
    /// project has not selected one.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Builds the client for an API key and base URL.
    pub fn client_for(api_key: &str, api_base: &str) -> Client<OpenAIConfig> {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Client::with_config(config)
    }

    fn classify(err: OpenAIError) -> PortError {
        if Self::is_rejected_key(&err) {
            PortError::Unauthorized(err.to_string())
        } else {
            PortError::Unexpected(err.to_string())
        }
    }

    /// Whether the provider refused the request because of the API key.
    fn is_rejected_key(err: &OpenAIError) -> bool {
        match err {
            OpenAIError::Reqwest(e) => matches!(e.status().map(|s| s.as_u16()), Some(401 | 403)),
            OpenAIError::ApiError(api) => {
                api.code.as_deref().is_some_and(is_auth_rejection)
                    || api.r#type.as_deref() == Some("authentication_error")
                    || is_auth_rejection(&api.message)
            }
            // Gemini reports errors as a JSON list, which fails to parse as an error object.
            OpenAIError::JSONDeserialize(_, body) => is_auth_rejection(body),
            _ => false,
        }
    }
}

//=========================================================================================
// `TranslationOracle` Trait Implementation
//=========================================================================================

#[async_trait]
impl TranslationOracle for OpenAiOracleAdapter {
    async fn complete(&self, prompt: &str, model: Option<&str>) -> PortResult<String> {
        let model = model.unwrap_or(&self.model);
        debug!(model, prompt_chars = prompt.chars().count(), "Sending prompt to oracle");

        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        )];

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("Oracle request failed: {}", e);
            Self::classify(e)
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PortError::Unexpected("The oracle returned no text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    fn api_error(message: &str, code: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: None,
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn rejected_keys_are_unauthorized() {
        let err = api_error("Incorrect API key provided", Some("invalid_api_key"));
        assert!(matches!(OpenAiOracleAdapter::classify(err), PortError::Unauthorized(_)));

        let parse_error = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        let body = r#"[{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT", "details": [{"reason": "API_KEY_INVALID"}]}}]"#;
        let err = OpenAIError::JSONDeserialize(parse_error, body.to_string());
        assert!(matches!(OpenAiOracleAdapter::classify(err), PortError::Unauthorized(_)));
    }

    #[test]
    fn other_provider_errors_stay_unexpected() {
        let err = api_error(
            "This model's maximum context length is 8192 tokens, you requested 54012 tokens",
            Some("context_length_exceeded"),
        );
        assert!(matches!(OpenAiOracleAdapter::classify(err), PortError::Unexpected(_)));

        let err = api_error("Rate limit reached: 401 requests per minute", None);
        assert!(matches!(OpenAiOracleAdapter::classify(err), PortError::Unexpected(_)));

        let err = OpenAIError::InvalidArgument("model must not be empty".to_string());
        assert!(matches!(OpenAiOracleAdapter::classify(err), PortError::Unexpected(_)));
    }
}
