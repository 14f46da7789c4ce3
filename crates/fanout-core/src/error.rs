use thiserror::Error;

/// Canonical result for the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot encode call: {0}")]
    Encoding(String),

    #[error("Cache corruption for {identifier} at {path}: {reason}")]
    CacheCorruption {
        identifier: String,
        path: String,
        reason: String,
    },

    #[error("Busy marker for {identifier} at {path} did not clear within {waited_ms} ms")]
    StaleLock {
        identifier: String,
        path: String,
        waited_ms: u64,
    },

    #[error("Execution of {identifier} failed: {message}")]
    ExecutionFailure {
        identifier: String,
        message: String,
    },

    #[error("Completed job {identifier} at {path} was never requested")]
    AnomalousCompletion { identifier: String, path: String },

    #[error("Scatter of {identifier} needs an execution tag")]
    MissingTag { identifier: String },

    #[error("No function registered under {0:?}")]
    UnknownFunction(String),

    #[error("Bad record: {0}")]
    Record(String),

    #[error("Tree error: {0}")]
    Tree(#[from] fanout_tree::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Record(e.to_string())
    }
}
