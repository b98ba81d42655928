use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chat_relay_providers::Message;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::state::AppState;

/// Reply used when the provider answers without any text
pub const FALLBACK_REPLY: &str = "Could not get a response";

/// Characters of each message echoed to the log
const LOG_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, GatewayError> {
    let message = match payload {
        Ok(Json(ChatRequest {
            message: Some(message),
        })) if !message.is_empty() => message,
        Ok(_) => return Err(GatewayError::InvalidRequest),
        Err(rejection) => {
            tracing::debug!("Rejected chat body: {}", rejection);
            return Err(GatewayError::InvalidRequest);
        }
    };

    let preview: String = message.chars().take(LOG_PREVIEW_CHARS).collect();
    tracing::info!("Processing message: {}...", preview);

    let settings = &state.settings;
    let response = state
        .provider
        .chat(
            vec![Message::user(message)],
            Some(settings.model.clone()),
            settings.max_tokens,
            settings.temperature,
        )
        .await
        .map_err(|e| {
            tracing::error!("Upstream provider error: {}", e);
            GatewayError::Upstream(e.detail())
        })?;

    let reply = response
        .text()
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_REPLY.to_string());

    tracing::info!(
        finish_reason = %response.finish_reason,
        prompt_tokens = response.usage.prompt_tokens,
        completion_tokens = response.usage.completion_tokens,
        "Response sent successfully"
    );
    Ok(Json(ChatResponse { response: reply }))
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use crate::state::CompletionSettings;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chat_relay_providers::{LLMProvider, LLMResponse, ProviderError, ProviderResult, Usage};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[derive(Debug, Clone)]
    struct RecordedCall {
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: u32,
        temperature: f32,
    }

    enum Outcome {
        Reply(Option<String>),
        ApiError(Option<String>),
    }

    struct FakeProvider {
        outcome: Outcome,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl FakeProvider {
        fn new(outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for FakeProvider {
        async fn chat(
            &self,
            messages: Vec<Message>,
            model: Option<String>,
            max_tokens: u32,
            temperature: f32,
        ) -> ProviderResult<LLMResponse> {
            self.calls.lock().push(RecordedCall {
                messages,
                model,
                max_tokens,
                temperature,
            });
            match &self.outcome {
                Outcome::Reply(content) => Ok(LLMResponse {
                    content: content.clone(),
                    finish_reason: "stop".to_string(),
                    usage: Usage::default(),
                }),
                Outcome::ApiError(message) => Err(ProviderError::Api {
                    status: 401,
                    message: message.clone(),
                }),
            }
        }
    }

    fn settings() -> CompletionSettings {
        CompletionSettings {
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    async fn post_chat(
        provider: Arc<FakeProvider>,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        let app = router(AppState::new(provider, settings()), "public");
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_message_is_bad_request() {
        let provider = FakeProvider::new(Outcome::Reply(Some("unused".into())));
        let (status, body) = post_chat(provider.clone(), "{}").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "Message is required"}));
        assert!(provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_or_malformed_message_is_bad_request() {
        let provider = FakeProvider::new(Outcome::Reply(Some("unused".into())));
        for body in [r#"{"message":""}"#, "not json", r#"{"message":null}"#] {
            let (status, json) = post_chat(provider.clone(), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json["error"], "Message is required");
        }
        assert!(provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_chat_forwards_single_user_message() {
        let provider = FakeProvider::new(Outcome::Reply(Some("Hello from the model".into())));
        let (status, body) = post_chat(provider.clone(), r#"{"message":"Hi there"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"response": "Hello from the model"}));

        let calls = provider.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages, vec![Message::user("Hi there")]);
        assert_eq!(calls[0].model.as_deref(), Some("llama-3.3-70b-versatile"));
        assert_eq!(calls[0].max_tokens, 1024);
        assert!((calls[0].temperature - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_content_uses_fallback_reply() {
        for content in [None, Some(String::new())] {
            let provider = FakeProvider::new(Outcome::Reply(content));
            let (status, body) = post_chat(provider, r#"{"message":"Hi"}"#).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["response"], FALLBACK_REPLY);
        }
    }

    #[tokio::test]
    async fn test_upstream_error_envelope_carries_detail() {
        let provider = FakeProvider::new(Outcome::ApiError(Some("Invalid API Key".into())));
        let (status, body) = post_chat(provider, r#"{"message":"Hi"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            serde_json::json!({
                "error": "An error occurred while processing the request",
                "details": "Invalid API Key"
            })
        );
    }

    #[tokio::test]
    async fn test_upstream_error_without_detail_is_generic() {
        let provider = FakeProvider::new(Outcome::ApiError(None));
        let (status, body) = post_chat(provider, r#"{"message":"Hi"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], "API Error");
    }

    #[tokio::test]
    async fn test_health() {
        let provider = FakeProvider::new(Outcome::Reply(None));
        let app = router(AppState::new(provider.clone(), settings()), "public");
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.message, "Server is running");
        assert!(provider.calls.lock().is_empty());
    }
}
