use thiserror::Error;
use vale_types::{ContentHash, TypeError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid hash {input:?}: {source}")]
    InvalidHash { input: String, source: TypeError },

    /// No cache entry, hint source, or fallback produced bytes. The message
    /// carries every per-source failure.
    #[error("{message}")]
    NotFound { hash: ContentHash, message: String },

    #[error("bytes do not match expected hash {expected} under any hash scheme")]
    HashMismatch { expected: ContentHash },

    /// A tree provider could not produce trees for a source.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("store error: {0}")]
    Store(#[from] vale_store::StoreError),

    #[error("config error: {0}")]
    Config(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
