//! Crate-spanning error taxonomy glue.

use thiserror::Error;

/// Errors shared by components that do not own a more specific error enum.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity_type} '{id}' not found")]
    NotFound { entity_type: String, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
