/// Errors raised while loading or drawing questions.
#[derive(Debug, thiserror::Error)]
pub enum QuestionError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("category {0} has no questions")]
    EmptyCategory(String),

    #[error("failed to read question file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse question file: {0}")]
    Parse(#[from] serde_json::Error),
}
