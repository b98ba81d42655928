use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// `error` field of every upstream failure envelope
pub const UPSTREAM_ERROR_TEXT: &str = "An error occurred while processing the request";

/// Failures surfaced to gateway callers
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or empty `message`
    #[error("Message is required")]
    InvalidRequest,

    /// Provider failure; carries the best-effort detail
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::InvalidRequest => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Message is required" })),
            )
                .into_response(),
            GatewayError::Upstream(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": UPSTREAM_ERROR_TEXT, "details": details })),
            )
                .into_response(),
        }
    }
}
