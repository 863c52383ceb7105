use std::path::PathBuf;

use vale_types::ContentHash;

/// Errors from blob cache and file tree operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cache entry could not be persisted.
    #[error("failed to persist blob {hash}: {reason}")]
    Persist { hash: ContentHash, reason: String },

    /// Walking a directory failed.
    #[error("failed to walk {path}: {reason}")]
    Walk { path: PathBuf, reason: String },

    /// A path component is not valid UTF-8.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
