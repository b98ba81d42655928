//! Base trait for LLM providers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detail reported when an upstream failure carries no message of its own
pub const GENERIC_API_ERROR: &str = "API Error";

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Non-success status; `message` is the body's `error.message` when present
    #[error("API error (HTTP {status}): {}", .message.as_deref().unwrap_or(GENERIC_API_ERROR))]
    Api { status: u16, message: Option<String> },
}

impl ProviderError {
    /// Best-effort detail for error envelopes shown to callers.
    pub fn detail(&self) -> String {
        match self {
            ProviderError::Api { message, .. } => message
                .clone()
                .unwrap_or_else(|| GENERIC_API_ERROR.to_string()),
            ProviderError::Http(e) => e.to_string(),
            ProviderError::InvalidResponse(msg) => msg.clone(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Response from an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: Option<String>,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

/// Token accounting reported by the upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

fn default_finish_reason() -> String {
    "stop".to_string()
}

impl LLMResponse {
    /// Completion text, treating an empty string like no content
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}

/// A message in the chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> ProviderResult<LLMResponse>;
}
