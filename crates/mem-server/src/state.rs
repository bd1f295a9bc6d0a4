//! Process-level singletons, constructed once in `main` and shared by
//! reference across every tool call (§9 "Singletons").

use std::sync::Arc;

use mem_config::Config;
use mem_embeddings::EmbeddingEngine;
use mem_index::VectorIndexController;
use mem_workspace::WorkspaceResolver;

pub struct AppState {
    pub config: Config,
    pub embeddings: Arc<EmbeddingEngine>,
    pub index: Arc<VectorIndexController>,
    pub workspace: Arc<WorkspaceResolver>,
}
