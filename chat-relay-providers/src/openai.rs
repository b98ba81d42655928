//! OpenAI-compatible chat-completions client

use async_trait::async_trait;
use chat_relay_core::config::ProviderConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult, Usage};

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error body returned with non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Client for any endpoint speaking the OpenAI chat-completions protocol
pub struct OpenAICompatClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    default_model: String,
    extra_headers: HashMap<String, String>,
}

impl OpenAICompatClient {
    /// Create a new client. A blank key sends no `Authorization` header;
    /// `timeout` unset leaves the transport default.
    pub fn new(
        api_key: Option<String>,
        api_base: impl Into<String>,
        default_model: impl Into<String>,
        extra_headers: Option<HashMap<String, String>>,
        timeout: Option<Duration>,
    ) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            default_model: default_model.into(),
            extra_headers: extra_headers.unwrap_or_default(),
        }
    }

    /// Build a client from the `provider` configuration section
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            Some(config.api_key.clone()),
            config.api_base.clone(),
            config.model.clone(),
            config.extra_headers.clone(),
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    /// Whether requests carry an API key
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn apply_headers(&self, mut req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }
        for (key, value) in &self.extra_headers {
            req_builder = req_builder.header(key, value);
        }
        req_builder
    }

    /// Map a completion body onto [`LLMResponse`]; the first choice wins.
    /// A body without choices yields no content rather than an error.
    fn parse_response(response: ChatCompletionResponse) -> LLMResponse {
        let choice = response.choices.into_iter().next();

        let (content, finish_reason) = match choice {
            Some(choice) => (
                choice.message.and_then(|m| m.content),
                choice.finish_reason,
            ),
            None => (None, None),
        };

        LLMResponse {
            content,
            finish_reason: finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage: response.usage,
        }
    }

    /// Pull `error.message` out of an error body, if it has one
    fn parse_error_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .and_then(|e| e.message)
            .filter(|m| !m.is_empty())
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> ProviderResult<LLMResponse> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature,
            max_tokens,
        };

        debug!(
            "Sending chat request to {} with model {}",
            self.api_base, request.model
        );

        let url = format!("{}/chat/completions", self.api_base);
        let req_builder = self.apply_headers(self.client.post(&url).json(&request));
        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let message = Self::parse_error_message(&error_text);
            warn!(
                "Provider returned HTTP {}: {}",
                status,
                message.as_deref().unwrap_or(&error_text)
            );
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let response_data: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("malformed completion body: {}", e))
        })?;
        Ok(Self::parse_response(response_data))
    }
}
