//! Error types for quill-core.

/// Errors raised by the engine. Unresolved references are never errors; they
/// fall back to neutral defaults instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
