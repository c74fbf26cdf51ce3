/// Errors that can occur while streaming a completion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(Box<dyn std::error::Error + Send + Sync>),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sse error: {0}")]
    Sse(String),

    #[error("api error ({code}): {message}")]
    Api { code: String, message: String },

    #[error("{0}")]
    Other(String),
}
