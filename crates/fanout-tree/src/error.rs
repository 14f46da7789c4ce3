use thiserror::Error;

/// Canonical result for tree operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Cannot aggregate an empty list of trees")]
    EmptyInput,

    #[error("Store error: {0}")]
    Store(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Store(e.to_string())
    }
}
