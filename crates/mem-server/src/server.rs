//! The MCP tool router: wraps the nine orchestrator operations in the
//! uniform envelope and exposes them over `rmcp`'s stdio transport.

use std::time::Instant;

use mem_core::Envelope;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_router, ServerHandler};
use serde_json::Value;

use crate::error::OrchestratorError;
use crate::orchestrator;
use crate::params::{
    BatchDeleteParams, CountParams, DeleteParams, GetParams, ListParams, QueryParams,
    StatusParams, StoreParams, UpdateParams,
};
use crate::state::AppState;

#[derive(Clone)]
pub struct MemoryServer {
    state: std::sync::Arc<AppState>,
    tool_router: ToolRouter<MemoryServer>,
}

impl MemoryServer {
    #[must_use]
    pub fn new(state: std::sync::Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }
}

fn envelope_result(start: Instant, outcome: Result<Value, OrchestratorError>) -> CallToolResult {
    let envelope = match outcome {
        Ok(data) => Envelope::ok("ok", data, start),
        Err(error) => {
            let error_type = error.error_type();
            let envelope = Envelope::error_response(error.to_string(), Some(error_type));
            envelope.with_metadata(duration_only(start))
        }
    };
    let is_error = !envelope.success;
    let text = serde_json::to_string(&envelope).unwrap_or_else(|_| "{}".to_string());
    let mut result = CallToolResult::success(vec![Content::text(text)]);
    result.is_error = Some(is_error);
    result
}

fn duration_only(start: Instant) -> Value {
    serde_json::json!({ "duration_ms": start.elapsed().as_millis() as u64 })
}

#[tool_router]
impl MemoryServer {
    #[tool(name = "memory-store", description = "Store a piece of content as a memory, with optional metadata and automatic chunking for long text.")]
    async fn memory_store(
        &self,
        Parameters(params): Parameters<StoreParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let start = Instant::now();
        let outcome = orchestrator::store(&self.state, params).await;
        Ok(envelope_result(start, outcome))
    }

    #[tool(name = "memory-query", description = "Search memories by semantic similarity, optionally combined with full-text hybrid search.")]
    async fn memory_query(
        &self,
        Parameters(params): Parameters<QueryParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let start = Instant::now();
        let outcome = orchestrator::query(&self.state, params).await;
        Ok(envelope_result(start, outcome))
    }

    #[tool(name = "memory-list", description = "List memories with filtering, sorting, and pagination.")]
    async fn memory_list(
        &self,
        Parameters(params): Parameters<ListParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let start = Instant::now();
        let outcome = orchestrator::list(&self.state, params).await;
        Ok(envelope_result(start, outcome))
    }

    #[tool(name = "memory-get", description = "Fetch a single memory by id.")]
    async fn memory_get(
        &self,
        Parameters(params): Parameters<GetParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let start = Instant::now();
        let outcome = orchestrator::get(&self.state, params).await;
        Ok(envelope_result(start, outcome))
    }

    #[tool(name = "memory-update", description = "Update a memory's content and/or metadata, optionally regenerating its embeddings.")]
    async fn memory_update(
        &self,
        Parameters(params): Parameters<UpdateParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let start = Instant::now();
        let outcome = orchestrator::update(&self.state, params).await;
        Ok(envelope_result(start, outcome))
    }

    #[tool(name = "memory-delete", description = "Delete a single memory by id.")]
    async fn memory_delete(
        &self,
        Parameters(params): Parameters<DeleteParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let start = Instant::now();
        let outcome = orchestrator::delete(&self.state, params).await;
        Ok(envelope_result(start, outcome))
    }

    #[tool(name = "memory-batch-delete", description = "Delete up to 100 memories by id in one call.")]
    async fn memory_batch_delete(
        &self,
        Parameters(params): Parameters<BatchDeleteParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let start = Instant::now();
        let outcome = orchestrator::batch_delete(&self.state, params).await;
        Ok(envelope_result(start, outcome))
    }

    #[tool(name = "memory-status", description = "Report collection and embedding-pipeline health and counts.")]
    async fn memory_status(
        &self,
        Parameters(params): Parameters<StatusParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let start = Instant::now();
        let outcome = orchestrator::status(&self.state, params).await;
        Ok(envelope_result(start, outcome))
    }

    #[tool(name = "memory-count", description = "Count memories matching an optional filter.")]
    async fn memory_count(
        &self,
        Parameters(params): Parameters<CountParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let start = Instant::now();
        let outcome = orchestrator::count(&self.state, params).await;
        Ok(envelope_result(start, outcome))
    }
}

impl ServerHandler for MemoryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            server_info: Implementation {
                name: "mcp-memory".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Persistent semantic memory over a vector index. Use memory-store to save, \
                 memory-query to recall by meaning, memory-list/-get/-count to browse, and \
                 memory-update/-delete/-batch-delete to maintain."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_marks_is_error() {
        let result = envelope_result(
            Instant::now(),
            Err(OrchestratorError::Validation("bad input".to_string())),
        );
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn success_envelope_is_not_an_error() {
        let result = envelope_result(Instant::now(), Ok(serde_json::json!({"id": "x"})));
        assert_eq!(result.is_error, Some(false));
    }
}
