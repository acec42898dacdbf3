use std::path::PathBuf;

use thiserror::Error;

/// Errors from the persisted tag map.
///
/// Only saving can fail; a missing or unreadable map on load is treated as
/// empty.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File system operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Map could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background write task failed
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
