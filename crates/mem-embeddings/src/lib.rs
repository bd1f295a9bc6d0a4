//! # mem-embeddings
//!
//! The embedding engine (C3): dual-vector generation (small + large), a
//! bounded LRU cache, retryable remote transport, and the chunker (C5).

pub mod cache;
pub mod chunk;
pub mod error;
pub mod provider;

use std::sync::Mutex;

use cache::LruCache;
pub use chunk::{chunk_text, ChunkWindow};
use error::EmbeddingError;
pub use provider::{validate_vector, Embedded, Provider};

/// A pair of dense vectors produced for one piece of text.
#[derive(Debug, Clone)]
pub struct DualEmbedding {
    pub small: Vec<f32>,
    pub large: Vec<f32>,
    pub cache_hits: u32,
    pub tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Default)]
pub struct EmbeddingStats {
    pub total_requested: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub tokens_total: u64,
    pub estimated_cost_usd: f64,
}

impl EmbeddingStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        if self.total_requested == 0 { 0.0 } else { self.cache_hits as f64 / self.total_requested as f64 }
    }
}

pub struct EmbeddingEngine {
    provider: Provider,
    cache: Mutex<LruCache>,
    tokens_total: Mutex<u64>,
    cost_total: Mutex<f64>,
}

impl EmbeddingEngine {
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self::with_cache_capacity(provider, 10_000)
    }

    #[must_use]
    pub fn with_cache_capacity(provider: Provider, capacity: usize) -> Self {
        Self {
            provider,
            cache: Mutex::new(LruCache::new(capacity)),
            tokens_total: Mutex::new(0),
            cost_total: Mutex::new(0.0),
        }
    }

    #[must_use]
    pub fn small_dims(&self) -> usize {
        self.provider.small_dims()
    }

    #[must_use]
    pub fn large_dims(&self) -> usize {
        self.provider.large_dims()
    }

    /// Produce `(small, large)` for `text`. The remote provider issues both
    /// calls concurrently; the local provider computes once and reuses the
    /// vector for both slots.
    pub async fn generate(&self, text: &str) -> Result<DualEmbedding, EmbeddingError> {
        if self.provider.shares_single_vector() {
            let (vector, cache_hits, tokens, cost) = self.cached_embed_small(text).await?;
            return Ok(DualEmbedding { small: vector.clone(), large: vector, cache_hits, tokens, cost_usd: cost });
        }

        let (small_result, large_result) =
            tokio::try_join!(self.cached_embed_small(text), self.cached_embed_large(text))?;

        Ok(DualEmbedding {
            small: small_result.0,
            large: large_result.0,
            cache_hits: small_result.1 + large_result.1,
            tokens: small_result.2 + large_result.2,
            cost_usd: small_result.3 + large_result.3,
        })
    }

    /// Compute the small-dimension chunk windows for `text`; the caller
    /// computes `large` per chunk on demand (§4.3).
    pub async fn generate_chunked(
        &self,
        text: &str,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<Vec<(ChunkWindow, Vec<f32>)>, EmbeddingError> {
        let windows = chunk_text(text, chunk_size, overlap);
        let mut out = Vec::with_capacity(windows.len());
        for window in windows {
            let (vector, ..) = self.cached_embed_small(&window.text).await?;
            out.push((window, vector));
        }
        Ok(out)
    }

    #[must_use]
    pub fn stats(&self) -> EmbeddingStats {
        let cache = self.cache.lock().expect("cache mutex poisoned");
        let hits = cache.hits();
        let misses = cache.misses();
        EmbeddingStats {
            total_requested: hits + misses,
            cache_hits: hits,
            cache_misses: misses,
            tokens_total: *self.tokens_total.lock().expect("tokens mutex poisoned"),
            estimated_cost_usd: *self.cost_total.lock().expect("cost mutex poisoned"),
        }
    }

    async fn cached_embed_small(&self, text: &str) -> Result<(Vec<f32>, u32, u64, f64), EmbeddingError> {
        self.cached_embed(text, self.provider.model_id(), self.small_dims(), true).await
    }

    async fn cached_embed_large(&self, text: &str) -> Result<(Vec<f32>, u32, u64, f64), EmbeddingError> {
        self.cached_embed(text, self.provider.model_id(), self.large_dims(), false).await
    }

    async fn cached_embed(
        &self,
        text: &str,
        model_id: &str,
        dims: usize,
        small: bool,
    ) -> Result<(Vec<f32>, u32, u64, f64), EmbeddingError> {
        let key = LruCache::cache_key(model_id, dims, text);
        if let Some(vector) = self.cache.lock().expect("cache mutex poisoned").get(&key) {
            return Ok((vector, 1, 0, 0.0));
        }

        let embedded = if small { self.provider.embed_small(text).await? } else { self.provider.embed_large(text).await? };
        if !validate_vector(&embedded.vector, dims) {
            return Err(EmbeddingError::InvalidVector { expected: dims, actual: embedded.vector.len() });
        }

        *self.tokens_total.lock().expect("tokens mutex poisoned") += embedded.tokens;
        *self.cost_total.lock().expect("cost mutex poisoned") += embedded.cost_usd;
        self.cache.lock().expect("cache mutex poisoned").insert(key, embedded.vector.clone());
        Ok((embedded.vector, 0, embedded.tokens, embedded.cost_usd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider::LocalProvider;

    fn test_engine() -> EmbeddingEngine {
        let provider = Provider::Local(LocalProvider::new(
            "Xenova/all-MiniLM-L6-v2",
            384,
            std::env::temp_dir(),
        ));
        EmbeddingEngine::new(provider)
    }

    #[test]
    fn stats_start_at_zero() {
        let engine = test_engine();
        let stats = engine.stats();
        assert_eq!(stats.total_requested, 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn local_provider_shares_dims_for_small_and_large() {
        let engine = test_engine();
        assert_eq!(engine.small_dims(), engine.large_dims());
    }
}
