pub mod sse;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::completion::CompletionBackend;
use crate::session::SessionStore;

/// Shared state handed to every transport handler. The session registry is
/// only touched by the full-duplex adapter; the one-shot adapter is
/// stateless by design.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub backend: Arc<dyn CompletionBackend>,
}

/// Build the full application router: both transports, a health probe,
/// permissive CORS, and static assets at the root path.
pub fn app(state: AppState, static_dir: &str) -> Router {
    let middleware = ServiceBuilder::new().layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/chat-stream", post(sse::chat_stream))
        .route("/health", get(|| async { "ok" }))
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware)
        .with_state(state)
}
