use std::sync::Arc;

use anyhow::Result;

use expo_relay::completion::OpenAiBackend;
use expo_relay::config::Config;
use expo_relay::handlers::{self, AppState};
use expo_relay::session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::load();

    let state = AppState {
        sessions: Arc::new(SessionStore::new()),
        backend: Arc::new(OpenAiBackend::new(&config.upstream)),
    };
    let app = handlers::app(state, &config.server.static_dir);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("Server running at http://{}", config.server.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
