use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, RelayError>;

/// Error taxonomy for the relay. None of these are fatal to the process:
/// transports translate them into user-visible events for the affected
/// turn or exchange only.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No API key was configured and no per-call override was supplied.
    #[error("upstream API key is not configured")]
    MissingApiKey,

    #[error("upstream completion error: {0}")]
    Upstream(#[from] async_openai::error::OpenAIError),

    #[error("unknown session: {0}")]
    Session(Uuid),

    #[error("websocket transport error: {0}")]
    Transport(#[from] axum::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}
