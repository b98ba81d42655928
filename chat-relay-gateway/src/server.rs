use axum::{
    routing::{get, post},
    Router,
};
use chat_relay_core::config::schema::GatewayConfig;
use std::path::Path;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::handlers::{chat_handler, health_handler};
use crate::state::AppState;

/// API routes plus the single-page app: existing files under `static_dir`
/// are served as-is, every other GET gets `index.html`.
pub fn router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let static_dir = static_dir.as_ref();
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/health", get(health_handler))
        .fallback_service(spa)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    config: &GatewayConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Server shutting down signal received");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chat_relay_core::config::schema::ProviderConfig;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn spa_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>chat</html>").unwrap();
        std::fs::write(dir.path().join("style.css"), "body{}").unwrap();
        dir
    }

    fn state() -> AppState {
        let config = ProviderConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            ..ProviderConfig::default()
        };
        AppState::from_config(&config)
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_unknown_path_serves_index() {
        let dir = spa_dir();
        let (status, body) = get_body(router(state(), dir.path()), "/chats/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>chat</html>");
    }

    #[tokio::test]
    async fn test_existing_file_is_served() {
        let dir = spa_dir();
        let (status, body) = get_body(router(state(), dir.path()), "/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body{}");
    }

    #[tokio::test]
    async fn test_cors_headers_present() {
        let dir = spa_dir();
        let response = router(state(), dir.path())
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_run_server_stops_on_shutdown() {
        let dir = spa_dir();
        let config = GatewayConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            static_dir: dir.path().to_string_lossy().to_string(),
        };
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(async move { run_server(state(), &config, rx).await });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
