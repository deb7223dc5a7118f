//! Error types for conversation memory and generation

use thiserror::Error;

/// Errors surfaced by the memory store and chat service
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("Corrupt chat history for session {session_id}: {source}")]
    CorruptHistory {
        session_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Unsupported message variant: {0}")]
    UnsupportedVariant(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Errors raised by a generation service while producing tokens
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Stream(String),

    #[error("generation cancelled")]
    Cancelled,
}

/// Result type alias for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;
