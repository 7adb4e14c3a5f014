//! Error types for the gramstat store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing the usage store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("cache for {0} used before warm-up")]
    CacheNotLoaded(&'static str),

    #[error("invalid value in {table}.{column}: {value}")]
    InvalidValue {
        table: &'static str,
        column: &'static str,
        value: String,
    },
}
