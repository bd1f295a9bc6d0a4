//! JSON-Schema'd input parameters for the nine MCP tools (§6 tool surface).

use std::collections::BTreeMap;

use mem_core::MemoryType;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FilterParams {
    pub workspace: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub min_confidence: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Arbitrary caller-supplied metadata key/value pairs, matched as
    /// equality and ANDed with the other filter conditions.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl From<FilterParams> for mem_core::SearchFilters {
    fn from(params: FilterParams) -> Self {
        Self {
            workspace: params.workspace,
            memory_type: params.memory_type,
            min_confidence: params.min_confidence,
            tags: params.tags,
            metadata: params.metadata,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct StoreParams {
    pub content: String,
    pub metadata: Option<Value>,
    #[serde(default = "default_true")]
    pub auto_chunk: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryParams {
    pub query: String,
    pub filter: Option<FilterParams>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub score_threshold: Option<f32>,
    pub hnsw_ef: Option<u64>,
    #[serde(default)]
    pub use_hybrid_search: bool,
    pub hybrid_alpha: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    UpdatedAt,
    AccessCount,
    Confidence,
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListParams {
    pub filter: Option<FilterParams>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetParams {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateParams {
    pub id: String,
    pub content: Option<String>,
    pub metadata: Option<Value>,
    #[serde(default)]
    pub reindex: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteParams {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BatchDeleteParams {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct StatusParams {
    pub workspace: Option<String>,
    #[serde(default = "default_true")]
    pub include_embedding_stats: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CountParams {
    pub filter: Option<FilterParams>,
}
