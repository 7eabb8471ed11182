// Library interface for chat_server
// Exposes the HTTP/WebSocket front end so it can be embedded or tested

pub mod config;
pub mod metrics;
mod views;
pub mod websocket;

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chat_hub::HubHandle;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{MakeSpan, TraceLayer};

use crate::metrics::{HealthStatus, ServerMetrics};

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub metrics: Arc<ServerMetrics>,
}

impl AppState {
    pub fn new(hub: HubHandle) -> Self {
        Self {
            hub,
            metrics: Arc::new(ServerMetrics::new()),
        }
    }
}

/// Build the application router.
///
/// With `static_dir` set, unmatched paths are served from that directory;
/// otherwise `/` renders the built-in chat page.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/history", get(history_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app.route("/", get(views::index)),
    };

    app.layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket::handle_websocket(socket, state))
}

/// Current archive, oldest first
async fn history_handler(State(state): State<AppState>) -> Response {
    match state.hub.history().await {
        Ok(events) => Json(events).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let metrics = state.metrics.snapshot();

    match state.hub.stats().await {
        Ok(stats) => Json(HealthStatus {
            status: "healthy".to_string(),
            subscribers: stats.subscribers as u64,
            archived: stats.archived as u64,
            connections: metrics.connections.active,
            uptime_secs: metrics.uptime_secs,
        })
        .into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthStatus {
                status: "unavailable".to_string(),
                subscribers: 0,
                archived: 0,
                connections: metrics.connections.active,
                uptime_secs: metrics.uptime_secs,
            }),
        )
            .into_response(),
    }
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use chat_hub::{HubActor, HubConfig};
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn history_lists_archived_events() {
        let hub = HubActor::spawn(HubConfig::default()).unwrap();
        hub.join("a").await.unwrap();
        hub.say("a", "hi").await.unwrap();
        let app = create_router(AppState::new(hub), None);

        let (status, body) = get_json(app, "/api/history").await;
        assert_eq!(status, StatusCode::OK);
        let events = body.as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["kind"], "join");
        assert_eq!(events[1]["text"], "hi");
    }

    #[tokio::test]
    async fn health_reports_hub_counts() {
        let hub = HubActor::spawn(HubConfig::default()).unwrap();
        let _sub = hub.subscribe().await.unwrap();
        hub.join("a").await.unwrap();
        let app = create_router(AppState::new(hub), None);

        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["subscribers"], 1);
        assert_eq!(body["archived"], 1);
    }

    #[tokio::test]
    async fn health_unavailable_after_hub_shutdown() {
        let hub = HubActor::spawn(HubConfig::default()).unwrap();
        hub.shutdown().await.unwrap();
        let app = create_router(AppState::new(hub), None);

        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unavailable");
    }

    #[tokio::test]
    async fn metrics_snapshot_is_served() {
        let hub = HubActor::spawn(HubConfig::default()).unwrap();
        let state = AppState::new(hub);
        state.metrics.connection_opened();
        let app = create_router(state, None);

        let (status, body) = get_json(app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connections"]["active"], 1);
    }

    #[tokio::test]
    async fn builtin_page_served_without_static_dir() {
        let hub = HubActor::spawn(HubConfig::default()).unwrap();
        let app = create_router(AppState::new(hub), None);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("/ws"));
    }

    #[tokio::test]
    async fn static_dir_replaces_builtin_page() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("index.html"), "<h1>custom client</h1>").unwrap();
        let hub = HubActor::spawn(HubConfig::default()).unwrap();
        let app = create_router(AppState::new(hub), Some(tmp.path()));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>custom client</h1>");
    }
}
