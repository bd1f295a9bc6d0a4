mod cli;
mod error;
mod orchestrator;
mod params;
mod server;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use mem_config::Config;
use mem_embeddings::provider::{LocalProvider, RemoteProvider};
use mem_embeddings::{EmbeddingEngine, Provider};
use mem_index::VectorIndexController;
use mem_workspace::WorkspaceResolver;
use qdrant_client::Qdrant;
use rmcp::ServiceExt;
use server::MemoryServer;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("mcp-memory error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_with(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.parse::<mem_config::LogLevel>().map_err(|error| anyhow::anyhow!(error)).context("invalid --log-level value")?;
    }
    init_tracing(&config.logging.level)?;

    let mut qdrant_builder = Qdrant::from_url(&config.index.url)
        .timeout(std::time::Duration::from_millis(config.index.timeout_ms));
    if let Some(token) = config.index.auth_token.clone() {
        qdrant_builder = qdrant_builder.api_key(token);
    }
    let qdrant = qdrant_builder.build().context("failed to construct Qdrant client")?;

    let provider = build_provider(&config).await?;
    let embeddings = Arc::new(EmbeddingEngine::new(provider));

    let index = Arc::new(VectorIndexController::new(
        qdrant,
        config.index.collection_name.clone(),
        embeddings.small_dims() as u64,
        embeddings.large_dims() as u64,
    ));
    index.initialize().await.context("collection schema initialization failed; refusing to serve")?;

    let workspace = Arc::new(WorkspaceResolver::new(
        std::time::Duration::from_millis(config.workspace.cache_ttl_ms),
        config.workspace.default.clone(),
    ));

    let state = Arc::new(AppState { config, embeddings, index, workspace });
    let server = MemoryServer::new(state);

    let transport = rmcp::transport::io::stdio();
    let service = server.serve(transport).await.inspect_err(|error| {
        eprintln!("mcp-memory serve error: {error}");
    })?;
    service.waiting().await?;
    Ok(())
}

async fn build_provider(config: &Config) -> anyhow::Result<Provider> {
    match config.embedding.resolved_provider() {
        mem_config::EmbeddingProvider::Remote => {
            let api_key = config
                .embedding
                .remote_api_key
                .clone()
                .context("remote embedding provider selected but no API key configured")?;
            Ok(Provider::Remote(RemoteProvider::new(
                REMOTE_API_BASE.to_string(),
                api_key,
                REMOTE_MODEL_ID.to_string(),
                config.embedding.local_dims,
                config.embedding.large_dims,
            )))
        }
        mem_config::EmbeddingProvider::Local | mem_config::EmbeddingProvider::Auto => {
            let cache_dir = std::path::PathBuf::from(&config.embedding.local_model_cache_dir);
            Ok(Provider::Local(LocalProvider::new(
                config.embedding.local_model_id.clone(),
                config.embedding.local_dims,
                cache_dir,
            )))
        }
    }
}

const REMOTE_API_BASE: &str = "https://api.openai.com/v1";
const REMOTE_MODEL_ID: &str = "text-embedding-3-large";

fn init_tracing(level: &mem_config::LogLevel) -> anyhow::Result<()> {
    let default_level = level.as_str();

    let filter = tracing_subscriber::EnvFilter::try_from_env("MCP_MEMORY_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
