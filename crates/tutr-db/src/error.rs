/// Storage-layer failures. Absence of a record is never an error; lookups
/// return `Ok(None)` instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chat not found: {0}")]
    ChatNotFound(i64),
}

pub type Result<T> = std::result::Result<T, Error>;
