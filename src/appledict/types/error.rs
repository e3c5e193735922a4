//! Custom error types for the appledict-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum DictError {
    /// The container (or cache directory) could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Block framing at `offset` is malformed or runs past the end of the container.
    #[error("Invalid block at offset {offset:#x}: {reason}")]
    Format { offset: u64, reason: String },

    /// The payload of the block at `offset` did not inflate to its declared size.
    #[error("Decompression failed for block at offset {offset:#x}: {reason}")]
    Decompression { offset: u64, reason: String },

    /// The query has no entry in the index. Carries the query as the caller typed it.
    #[error("\"{query}\" not found in dictionary")]
    NotFound { query: String },

    /// The index could not be serialized for the on-disk cache.
    #[error("Index cache error: {0}")]
    Cache(String),
}

impl DictError {
    pub(crate) fn format(offset: u64, reason: impl Into<String>) -> Self {
        DictError::Format { offset, reason: reason.into() }
    }

    pub(crate) fn decompression(offset: u64, reason: impl Into<String>) -> Self {
        DictError::Decompression { offset, reason: reason.into() }
    }
}

impl From<serde_json::Error> for DictError {
    fn from(e: serde_json::Error) -> Self {
        DictError::Cache(e.to_string())
    }
}

/// A convenience `Result` type alias using the crate's `DictError` type.
pub type Result<T> = std::result::Result<T, DictError>;
