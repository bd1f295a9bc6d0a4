//! Vector index controller error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector index connection failed: {0}")]
    Connection(String),

    #[error("vector index query failed: {0}")]
    Query(String),

    #[error("collection schema mismatch: {}", .0.join("; "))]
    SchemaMismatch(Vec<String>),

    #[error("point '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
