/// Core error type for the bridge.
///
/// Adapter crates map their specific errors into this type so the bot core
/// can handle failures consistently (fatal at startup vs surfaced to the
/// handler that made the call).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing configuration: {0}")]
    Config(String),

    #[error("chat completion returned no content")]
    EmptyCompletion,

    #[error("image generation returned no url")]
    EmptyImageResult,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
