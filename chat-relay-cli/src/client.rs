use anyhow::Result;
use async_trait::async_trait;
use chat_relay_core::session::CompletionClient;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, warn};

/// Shown in place of a reply when the gateway cannot be reached
pub const NETWORK_ERROR_REPLY: &str = "Sorry, a network error occurred.";

/// HTTP client for the gateway's `/api` routes
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

#[derive(Deserialize)]
struct ErrorReply {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Post one message and return the reply or a user-facing error text.
    pub async fn chat(&self, message: &str) -> String {
        let url = format!("{}/chat", self.base_url);
        let response = match self
            .client
            .post(&url)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Fetch error: {}", e);
                return NETWORK_ERROR_REPLY.to_string();
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gateway returned {}: {}", status, body);
            let reason = serde_json::from_str::<ErrorReply>(&body)
                .ok()
                .and_then(|r| r.error)
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                });
            return format!("Sorry, an error occurred: {}", reason);
        }

        match response.json::<ChatReply>().await {
            Ok(reply) => reply.response,
            Err(e) => {
                error!("Unreadable gateway reply: {}", e);
                NETWORK_ERROR_REPLY.to_string()
            }
        }
    }

    /// Check the liveness route
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Server returned error: {}", response.status());
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CompletionClient for ApiClient {
    async fn complete(&self, message: &str) -> String {
        self.chat(message).await
    }
}
