/// Everything that can stop a study plan from being generated.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "chat '{session}', turn {turn}: selected response {index} does not exist ({available} available)"
    )]
    InvalidTurnIndex {
        session: String,
        turn: usize,
        index: usize,
        available: usize,
    },

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("no active backend: {0}")]
    NoActiveBackend(String),

    #[error("configuration \"{0}\" not found")]
    ConfigurationNotFound(String),

    #[error("a study plan is already being generated")]
    AlreadyGenerating,

    #[error("generation interrupted: {0}")]
    BackendStream(String),

    #[error(transparent)]
    Backend(#[from] tutr_llm::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
