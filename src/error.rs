//! Error taxonomy for the indexing and search core.

use thiserror::Error;

/// Errors surfaced by indexing, search, and the vector index.
#[derive(Debug, Error)]
pub enum Error {
    /// The memory folder (or index entry) does not exist.
    #[error("memory not found: {0}")]
    NotFound(String),

    /// Embedding backend unreachable or returned a malformed response.
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// Vector dimensionality disagrees with the collection.
    #[error("dimension mismatch: collection has {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Caller passed something the index cannot store.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("index lock poisoned")]
    LockPoisoned,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap any displayable backend failure as a provider error.
    pub fn provider(err: impl std::fmt::Display) -> Self {
        Self::Provider(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
