//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the chat reply LLM. Gemini is reached
//! through its OpenAI-compatible endpoint, so the `async-openai` client is used
//! with a custom base URL. It implements the `TextGenerationService` port.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use chat_core::ports::{GenerationError, TextGenerationService};
use std::time::Duration;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationService` against Gemini.
///
/// No `Debug` derive: the client holds the API key.
#[derive(Clone)]
pub struct GeminiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl GeminiChatAdapter {
    pub fn new(api_key: &str, api_base: &str, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        // A zero elapsed-time budget turns off the client's built-in retries;
        // a failed call must fall back to a canned reply straight away.
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        Self {
            client: Client::with_config(config).with_backoff(no_retry),
            model,
        }
    }

    fn build_request(&self, prompt: &str) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                },
            )],
            n: Some(1),
            ..Default::default()
        }
    }
}

//=========================================================================================
// `TextGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextGenerationService for GeminiChatAdapter {
    async fn generate_reply(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .client
            .chat()
            .create(self.build_request(prompt))
            .await
            .map_err(map_openai_error)?;

        // An empty body is not an error; the caller substitutes its own text.
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

const RATE_LIMIT_MARKERS: [&str; 4] = [
    "rate_limit_exceeded",
    "rate_limit_error",
    "RESOURCE_EXHAUSTED",
    "429",
];
const UNAVAILABLE_MARKERS: [&str; 4] = ["server_error", "overloaded_error", "UNAVAILABLE", "503"];

fn has_marker(markers: &[&str], values: &[&str]) -> bool {
    values.iter().any(|v| markers.contains(v))
}

/// Sorts provider failures into the three outcomes the chat flow distinguishes.
fn map_openai_error(err: OpenAIError) -> GenerationError {
    match &err {
        // 5xx bodies are not parsed by the client; the raw body is the message.
        OpenAIError::ApiError(api_err) if api_err.code.is_none() && api_err.r#type.is_none() => {
            classify_body(&api_err.message).unwrap_or_else(|| GenerationError::Other(err.to_string()))
        }
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");
            if has_marker(&RATE_LIMIT_MARKERS, &[code, error_type]) {
                GenerationError::RateLimited
            } else if has_marker(&UNAVAILABLE_MARKERS, &[code, error_type]) {
                GenerationError::Unavailable
            } else {
                GenerationError::Other(err.to_string())
            }
        }
        // Gemini's error envelope carries a numeric `code`, which does not fit
        // the OpenAI error shape and surfaces here as raw text.
        OpenAIError::JSONDeserialize(_, content) => {
            classify_body(content).unwrap_or_else(|| GenerationError::Other(err.to_string()))
        }
        _ => GenerationError::Other(err.to_string()),
    }
}

fn classify_body(body: &str) -> Option<GenerationError> {
    if body.contains("RESOURCE_EXHAUSTED") || body.contains("429") {
        Some(GenerationError::RateLimited)
    } else if body.contains("UNAVAILABLE") || body.contains("503") {
        Some(GenerationError::Unavailable)
    } else {
        None
    }
}
