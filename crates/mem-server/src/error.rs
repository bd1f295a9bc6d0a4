//! Aggregates every component error enum and classifies it into the
//! envelope's machine-readable `error_type` (§7).

use mem_core::ErrorType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Core(#[from] mem_core::CoreError),

    #[error(transparent)]
    Config(#[from] mem_config::ConfigError),

    #[error(transparent)]
    Secrets(#[from] mem_secrets::SecretsError),

    #[error(transparent)]
    Embedding(#[from] mem_embeddings::error::EmbeddingError),

    #[error(transparent)]
    Index(#[from] mem_index::IndexError),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{entity_type} '{id}' not found")]
    NotFound { entity_type: String, id: String },

    #[error("chunk member '{id}' cannot be updated directly (group {chunk_group_id})")]
    ChunkMemberUpdate { id: String, chunk_group_id: String },

    #[error("content blocked: secrets detected ({types})")]
    SecretsDetected { types: String },
}

impl OrchestratorError {
    #[must_use]
    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::Validation(_) | Self::ChunkMemberUpdate { .. } | Self::SecretsDetected { .. } => {
                ErrorType::ValidationError
            }
            Self::NotFound { .. } => ErrorType::NotFoundError,
            Self::Core(mem_core::CoreError::NotFound { .. }) => ErrorType::NotFoundError,
            Self::Core(mem_core::CoreError::Validation(_)) => ErrorType::ValidationError,
            Self::Index(mem_index::IndexError::NotFound(_)) => ErrorType::NotFoundError,
            Self::Index(mem_index::IndexError::Connection(_)) => ErrorType::ConnectionError,
            Self::Index(mem_index::IndexError::SchemaMismatch(_)) => ErrorType::ServerError,
            Self::Config(_) => ErrorType::ServerError,
            _ => ErrorType::ExecutionError,
        }
    }
}
