//! Embedding provider selection and dimension configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Auto,
    Remote,
    Local,
}

impl Default for EmbeddingProvider {
    fn default() -> Self {
        Self::Auto
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub remote_api_key: Option<String>,
    #[serde(default)]
    pub provider: EmbeddingProvider,
    #[serde(default = "default_local_model_id")]
    pub local_model_id: String,
    #[serde(default = "default_local_dims")]
    pub local_dims: usize,
    #[serde(default = "default_large_dims")]
    pub large_dims: usize,
    #[serde(default = "default_model_cache_dir")]
    pub local_model_cache_dir: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            remote_api_key: None,
            provider: EmbeddingProvider::default(),
            local_model_id: default_local_model_id(),
            local_dims: default_local_dims(),
            large_dims: default_large_dims(),
            local_model_cache_dir: default_model_cache_dir(),
        }
    }
}

impl EmbeddingConfig {
    /// `remote` requires the key; `auto` picks `remote` iff the key is
    /// present, else `local`.
    #[must_use]
    pub fn resolved_provider(&self) -> EmbeddingProvider {
        match self.provider {
            EmbeddingProvider::Remote => EmbeddingProvider::Remote,
            EmbeddingProvider::Local => EmbeddingProvider::Local,
            EmbeddingProvider::Auto if self.remote_api_key.is_some() => EmbeddingProvider::Remote,
            EmbeddingProvider::Auto => EmbeddingProvider::Local,
        }
    }
}

fn default_local_model_id() -> String {
    "Xenova/all-MiniLM-L6-v2".to_string()
}

const fn default_local_dims() -> usize {
    384
}

const fn default_large_dims() -> usize {
    3072
}

fn default_model_cache_dir() -> String {
    dirs::home_dir()
        .map(|home| home.join(".cache/mcp-memory/models"))
        .unwrap_or_else(|| std::path::PathBuf::from(".cache/mcp-memory/models"))
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.local_model_id, "Xenova/all-MiniLM-L6-v2");
        assert_eq!(config.local_dims, 384);
        assert_eq!(config.large_dims, 3072);
    }

    #[test]
    fn auto_resolves_to_remote_when_key_present() {
        let config = EmbeddingConfig {
            remote_api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_provider(), EmbeddingProvider::Remote);
    }

    #[test]
    fn auto_resolves_to_local_without_key() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.resolved_provider(), EmbeddingProvider::Local);
    }
}
