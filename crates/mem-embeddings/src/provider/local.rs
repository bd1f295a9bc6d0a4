//! Local CPU embedding provider backed by `fastembed`.
//!
//! Loads lazily on first use and is cached on disk under a user cache
//! directory (§5 "the local embedding pipeline loads lazily on first use
//! and is thereafter shared read-only").

use std::path::PathBuf;
use std::sync::Arc;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::{Mutex, OnceCell};

use super::Embedded;
use crate::error::EmbeddingError;

pub struct LocalProvider {
    model_id: String,
    dims: usize,
    cache_dir: PathBuf,
    model: OnceCell<Arc<Mutex<TextEmbedding>>>,
}

impl LocalProvider {
    #[must_use]
    pub fn new(model_id: impl Into<String>, dims: usize, cache_dir: PathBuf) -> Self {
        Self { model_id: model_id.into(), dims, cache_dir, model: OnceCell::new() }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub const fn dims(&self) -> usize {
        self.dims
    }

    async fn model(&self) -> Result<Arc<Mutex<TextEmbedding>>, EmbeddingError> {
        self.model
            .get_or_try_init(|| async {
                let cache_dir = self.cache_dir.clone();
                let embedding_model = resolve_model(&self.model_id)?;
                let loaded = tokio::task::spawn_blocking(move || {
                    TextEmbedding::try_new(
                        InitOptions::new(embedding_model).with_cache_dir(cache_dir),
                    )
                })
                .await
                .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?
                .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;
                Ok::<_, EmbeddingError>(Arc::new(Mutex::new(loaded)))
            })
            .await
            .cloned()
    }

    /// Mean-pooled, L2-normalized feature extraction over CPU. Cost is
    /// always zero for the local provider.
    pub async fn embed(&self, text: &str) -> Result<Embedded, EmbeddingError> {
        let model = self.model().await?;
        let text = text.to_string();
        let vector = tokio::task::spawn_blocking(move || {
            let mut guard = model.blocking_lock();
            guard.embed(vec![text], None)
        })
        .await
        .map_err(|e| EmbeddingError::EmbedFailed(e.to_string()))?
        .map_err(|e| EmbeddingError::EmbedFailed(e.to_string()))?
        .into_iter()
        .next()
        .ok_or(EmbeddingError::EmptyResult)?;

        Ok(Embedded { vector, tokens: 0, cost_usd: 0.0 })
    }
}

fn resolve_model(model_id: &str) -> Result<EmbeddingModel, EmbeddingError> {
    match model_id {
        "Xenova/all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(EmbeddingError::InitFailed(format!("unsupported local model id '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_model_accepts_default_alias() {
        assert!(resolve_model("Xenova/all-MiniLM-L6-v2").is_ok());
    }

    #[test]
    fn resolve_model_rejects_unknown_id() {
        assert!(resolve_model("not-a-real-model").is_err());
    }
}
