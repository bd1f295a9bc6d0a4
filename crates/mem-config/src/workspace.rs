//! Workspace resolver configuration (C2).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_true")]
    pub auto_detect: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            auto_detect: default_true(),
            default: None,
            cache_ttl_ms: default_cache_ttl_ms(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_cache_ttl_ms() -> u64 {
    60_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = WorkspaceConfig::default();
        assert!(config.auto_detect);
        assert_eq!(config.cache_ttl_ms, 60_000);
        assert!(config.default.is_none());
    }
}
