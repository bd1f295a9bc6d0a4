//! Provider abstraction: remote HTTP API vs local CPU inference.

mod local;
mod remote;

pub use local::LocalProvider;
pub use remote::RemoteProvider;

use crate::error::EmbeddingError;

/// A single generated vector plus the token/cost accounting for that call.
/// `tokens` and `cost_usd` are always zero for the local provider.
#[derive(Debug, Clone)]
pub struct Embedded {
    pub vector: Vec<f32>,
    pub tokens: u64,
    pub cost_usd: f64,
}

pub enum Provider {
    Remote(RemoteProvider),
    Local(LocalProvider),
}

impl Provider {
    pub fn model_id(&self) -> &str {
        match self {
            Self::Remote(p) => p.model_id(),
            Self::Local(p) => p.model_id(),
        }
    }

    /// Embed `text` at the small dimension. For the remote provider this is
    /// a distinct API call from `embed_large`; for the local provider both
    /// delegate to the same single inference pass.
    pub async fn embed_small(&self, text: &str) -> Result<Embedded, EmbeddingError> {
        match self {
            Self::Remote(p) => p.embed(text, p.small_dims()).await,
            Self::Local(p) => p.embed(text).await,
        }
    }

    pub async fn embed_large(&self, text: &str) -> Result<Embedded, EmbeddingError> {
        match self {
            Self::Remote(p) => p.embed(text, p.large_dims()).await,
            Self::Local(p) => p.embed(text).await,
        }
    }

    pub fn small_dims(&self) -> usize {
        match self {
            Self::Remote(p) => p.small_dims(),
            Self::Local(p) => p.dims(),
        }
    }

    pub fn large_dims(&self) -> usize {
        match self {
            Self::Remote(p) => p.large_dims(),
            Self::Local(p) => p.dims(),
        }
    }

    /// Local provider produces one vector reused for both slots; the
    /// engine uses this to skip the redundant second inference pass.
    pub const fn shares_single_vector(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

/// A vector is valid iff it is exactly `expected` long and every
/// component is finite.
#[must_use]
pub fn validate_vector(vector: &[f32], expected: usize) -> bool {
    vector.len() == expected && vector.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_vector_rejects_wrong_length() {
        assert!(!validate_vector(&[1.0, 2.0], 3));
    }

    #[test]
    fn validate_vector_rejects_non_finite() {
        assert!(!validate_vector(&[1.0, f32::NAN], 2));
        assert!(!validate_vector(&[1.0, f32::INFINITY], 2));
    }

    #[test]
    fn validate_vector_accepts_good_vector() {
        assert!(validate_vector(&[1.0, 2.0, 3.0], 3));
    }
}
