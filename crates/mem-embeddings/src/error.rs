//! Embedding engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to initialize the local embedding model: {0}")]
    InitFailed(String),

    #[error("embedding request failed: {0}")]
    EmbedFailed(String),

    #[error("embedding provider returned an empty result")]
    EmptyResult,

    #[error("embedding vector failed validation: expected {expected} finite components, got {actual}")]
    InvalidVector { expected: usize, actual: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
