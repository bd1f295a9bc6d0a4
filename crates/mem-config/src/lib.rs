//! # mem-config
//!
//! Layered configuration loading for the memory service using figment.
//!
//! Configuration sources (in priority order):
//! 1. Environment variables (`MCP_MEMORY_*`)
//! 2. Project-level `.mcp-memory/config.toml`
//! 3. User-level `~/.config/mcp-memory/config.toml`
//! 4. Built-in defaults

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod logging;
pub mod workspace;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub use chunk::ChunkConfig;
pub use embedding::{EmbeddingConfig, EmbeddingProvider};
pub use error::ConfigError;
pub use index::IndexConfig;
pub use logging::{LogLevel, LoggingConfig};
pub use workspace::WorkspaceConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunk: ChunkConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the layered sources, lowest priority first.
    ///
    /// # Errors
    /// Returns `ConfigError` when a source fails to parse or a loaded value
    /// fails cross-field validation (e.g. a too-short auth token).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load configuration, merging an explicit config file (e.g. from a
    /// `--config` flag) above the project and user files but below env vars.
    ///
    /// # Errors
    /// Returns `ConfigError` when a source fails to parse or a loaded value
    /// fails cross-field validation (e.g. a too-short auth token).
    pub fn load_with(explicit_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(user_config) = user_config_path() {
            figment = figment.merge(Toml::file(user_config));
        }
        figment = figment.merge(Toml::file(project_config_path()));
        if let Some(path) = explicit_path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("MCP_MEMORY_").split("_"));

        let config: Self = figment.extract()?;
        config.index.validate()?;
        Ok(config)
    }
}

fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mcp-memory").join("config.toml"))
}

fn project_config_path() -> std::path::PathBuf {
    std::path::PathBuf::from(".mcp-memory").join("config.toml")
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_load_without_any_source() {
        Jail::expect_with(|jail| {
            jail.set_env("HOME", jail.directory().display().to_string());
            let config = Config::load().expect("defaults should load");
            assert_eq!(config.index.collection_name, "mcp-memory");
            assert_eq!(config.chunk.chunk_size, 1000);
            Ok(())
        });
    }

    #[test]
    fn env_override_wins_over_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("HOME", jail.directory().display().to_string());
            jail.set_env("MCP_MEMORY_INDEX_URL", "http://qdrant.internal:6333");
            let config = Config::load().expect("config should load");
            assert_eq!(config.index.url, "http://qdrant.internal:6333");
            Ok(())
        });
    }

    #[test]
    fn project_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("HOME", jail.directory().display().to_string());
            jail.create_dir(".mcp-memory")?;
            jail.create_file(
                ".mcp-memory/config.toml",
                "[index]\ncollection_name = \"project-memories\"\n",
            )?;
            let config = Config::load().expect("config should load");
            assert_eq!(config.index.collection_name, "project-memories");
            Ok(())
        });
    }
}
