//! Vector-index connection and schema configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            auth_token: None,
            collection_name: default_collection_name(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl IndexConfig {
    /// `Index auth token | — | Must be ≥8 chars when present`.
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if let Some(token) = &self.auth_token {
            if token.len() < 8 {
                return Err(crate::error::ConfigError::InvalidValue {
                    field: "index.auth_token".to_string(),
                    reason: "must be at least 8 characters when present".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn default_index_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection_name() -> String {
    "mcp-memory".to_string()
}

const fn default_timeout_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = IndexConfig::default();
        assert_eq!(config.url, "http://localhost:6333");
        assert_eq!(config.collection_name, "mcp-memory");
        assert_eq!(config.timeout_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn short_auth_token_is_rejected() {
        let config = IndexConfig {
            auth_token: Some("short".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
