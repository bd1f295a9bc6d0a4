//! Command-line flags for the `mcp-memory` stdio server. The server itself
//! takes no subcommands; flags only override configuration layering.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "mcp-memory", version, about = "Persistent semantic memory MCP server")]
pub struct Cli {
    /// Path to a config file layered above the default search locations.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the configured log level (debug, info, warn, error).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_no_flags() {
        let cli = Cli::parse_from(["mcp-memory"]);
        assert!(cli.config.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn parses_config_and_log_level() {
        let cli = Cli::parse_from(["mcp-memory", "--config", "/etc/mcp-memory.toml", "--log-level", "debug"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/mcp-memory.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
