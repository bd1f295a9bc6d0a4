//! The nine tool operations (C6), composed atop C1–C5. Each function
//! returns the envelope's `data` payload; the transport layer (`server.rs`)
//! wraps it, times it, and classifies failures (§4.5, §7).

use chrono::Utc;
use mem_core::{MemoryType, SearchFilters};
use mem_index::{ScoredPoint, SearchInput, UpsertInput};
use serde_json::{json, Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::params::{
    BatchDeleteParams, CountParams, FilterParams, GetParams, ListParams, QueryParams, SortBy,
    SortOrder, StatusParams, StoreParams, UpdateParams,
};
use crate::state::AppState;

const LIST_SCAN_CAP: u64 = 10_000;
const LIST_PREVIEW_CHARS: usize = 200;

fn parse_uuid(id: &str) -> Result<Uuid, OrchestratorError> {
    Uuid::parse_str(id).map_err(|_| OrchestratorError::Validation(format!("'{id}' is not a valid id")))
}

fn scan_or_block(content: &str) -> Result<String, OrchestratorError> {
    let result = mem_secrets::scan(content);
    if result.decision == mem_secrets::Decision::Block {
        let types = result.detections.iter().map(|d| d.secret_type.as_str()).collect::<Vec<_>>().join(", ");
        return Err(OrchestratorError::SecretsDetected { types });
    }
    Ok(result.sanitized)
}

fn resolve_workspace(state: &AppState, metadata: &Value) -> Option<String> {
    if let Some(explicit) = metadata.get("workspace").and_then(Value::as_str) {
        return Some(mem_workspace::normalize_for_storage(explicit));
    }
    let cwd = std::env::current_dir().unwrap_or_default();
    state
        .workspace
        .resolve(mem_workspace::Explicit::NotProvided, &cwd)
        .ok()
        .and_then(|resolved| resolved.value)
}

fn metadata_fields(metadata: &Option<Value>) -> Map<String, Value> {
    match metadata {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

fn default_expires_at(memory_type: MemoryType, created_at: chrono::DateTime<Utc>) -> Option<Value> {
    memory_type.default_ttl().map(|ttl| Value::String((created_at + ttl).to_rfc3339()))
}

pub async fn store(state: &AppState, params: StoreParams) -> Result<Value, OrchestratorError> {
    let sanitized = scan_or_block(&params.content)?;
    let mut fields = metadata_fields(&params.metadata);
    let now = Utc::now();

    let memory_type = fields
        .get("memory_type")
        .and_then(Value::as_str)
        .and_then(|s| match s {
            "episodic" => Some(MemoryType::Episodic),
            "short-term" => Some(MemoryType::ShortTerm),
            "long-term" => Some(MemoryType::LongTerm),
            _ => None,
        })
        .unwrap_or_default();

    if !fields.contains_key("expires_at") {
        if let Some(expires) = default_expires_at(memory_type, now) {
            fields.insert("expires_at".to_string(), expires);
        }
    }

    let workspace = resolve_workspace(state, &params.metadata.clone().unwrap_or(Value::Null));
    if let Some(workspace) = workspace {
        fields.insert("workspace".to_string(), Value::String(workspace));
    }
    fields.insert("memory_type".to_string(), Value::String(memory_type.as_str().to_string()));

    let chunk_threshold = state.config.chunk.chunk_size;
    if params.auto_chunk && sanitized.chars().count() > chunk_threshold {
        return store_chunked(state, &sanitized, fields, chunk_threshold).await;
    }

    let dual = state.embeddings.generate(&sanitized).await?;
    let mut payload = fields;
    payload.insert("content".to_string(), Value::String(sanitized));
    let id = state
        .index
        .upsert(UpsertInput {
            id: None,
            dense_small: dual.small,
            dense_large: dual.large,
            payload: Value::Object(payload),
        })
        .await?;

    Ok(json!({ "id": id }))
}

async fn store_chunked(
    state: &AppState,
    content: &str,
    base_fields: Map<String, Value>,
    chunk_threshold: usize,
) -> Result<Value, OrchestratorError> {
    let chunk_group_id = Uuid::new_v4();
    let overlap = state.config.chunk.chunk_overlap;
    let windows = state.embeddings.generate_chunked(content, chunk_threshold, overlap).await?;
    let total_chunks = windows.len() as u32;

    let mut ids = Vec::with_capacity(windows.len());
    for (window, small) in windows {
        let dual = state.embeddings.generate(&window.text).await?;
        let mut payload = base_fields.clone();
        payload.insert("content".to_string(), Value::String(window.text.clone()));
        payload.insert("chunk_index".to_string(), Value::from(window.index));
        payload.insert("total_chunks".to_string(), Value::from(total_chunks));
        payload.insert("chunk_group_id".to_string(), Value::String(chunk_group_id.to_string()));

        let id = state
            .index
            .upsert(UpsertInput {
                id: None,
                dense_small: small,
                dense_large: dual.large,
                payload: Value::Object(payload),
            })
            .await?;
        ids.push(id);
    }

    Ok(json!({ "ids": ids, "chunk_count": total_chunks, "chunk_group_id": chunk_group_id }))
}

pub async fn query(state: &AppState, params: QueryParams) -> Result<Value, OrchestratorError> {
    let dual = state.embeddings.generate(&params.query).await?;
    let filters: SearchFilters = params.filter.map(FilterParams::into).unwrap_or_default();
    let filter = mem_index::build_filter(&filters);

    let input = SearchInput {
        vector: dual.small,
        large_vector: Some(dual.large),
        filter,
        limit: u64::from(params.limit.unwrap_or(10)),
        offset: u64::from(params.offset.unwrap_or(0)),
        score_threshold: params.score_threshold,
        hnsw_ef: params.hnsw_ef,
    };

    let hits = if params.use_hybrid_search {
        state.index.hybrid_search(&params.query, input).await?
    } else {
        state.index.search(input).await?
    };

    Ok(json!({ "query": params.query, "results": hits.into_iter().map(hit_to_json).collect::<Vec<_>>() }))
}

fn hit_to_json(hit: ScoredPoint) -> Value {
    let content = hit.payload.get("content").and_then(Value::as_str).unwrap_or_default().to_string();
    json!({ "id": hit.id, "content": content, "score": hit.score, "metadata": hit.payload })
}

pub async fn list(state: &AppState, params: ListParams) -> Result<Value, OrchestratorError> {
    let filters: SearchFilters = params.filter.map(FilterParams::into).unwrap_or_default();
    let filter = mem_index::build_filter(&filters);
    let limit = u64::from(params.limit.unwrap_or(100));
    let offset = u64::from(params.offset.unwrap_or(0));

    let points = if matches!(params.sort_by, SortBy::CreatedAt) {
        state.index.list(filter, limit, offset).await?
    } else {
        let total = state.index.count(filter.clone()).await?;
        let capped = total.min(LIST_SCAN_CAP);
        if total > LIST_SCAN_CAP {
            warn!(total, cap = LIST_SCAN_CAP, "list sort capped at 10000 rows");
        }
        let mut rows = state.index.list(filter, capped, 0).await?;
        sort_rows(&mut rows, params.sort_by);
        if matches!(params.sort_order, SortOrder::Asc) {
            rows.reverse();
        }
        rows.into_iter().skip(offset as usize).take(limit as usize).collect()
    };

    let previews: Vec<Value> = points.into_iter().map(preview_json).collect();
    Ok(json!({ "results": previews }))
}

fn sort_rows(rows: &mut [ScoredPoint], sort_by: SortBy) {
    let key = |row: &ScoredPoint| -> f64 {
        let field = match sort_by {
            SortBy::CreatedAt => "created_at",
            SortBy::UpdatedAt => "updated_at",
            SortBy::AccessCount => "access_count",
            SortBy::Confidence => "confidence",
        };
        match row.payload.get(field) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.timestamp_millis() as f64)
                .unwrap_or(0.0),
            _ => 0.0,
        }
    };
    rows.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(std::cmp::Ordering::Equal));
}

fn preview_json(point: ScoredPoint) -> Value {
    let mut payload = point.payload;
    if let Some(Value::String(content)) = payload.get_mut("content") {
        if content.chars().count() > LIST_PREVIEW_CHARS {
            *content = content.chars().take(LIST_PREVIEW_CHARS).collect();
        }
    }
    json!({ "id": point.id, "metadata": payload })
}

pub async fn get(state: &AppState, params: GetParams) -> Result<Value, OrchestratorError> {
    let id = parse_uuid(&params.id)?;
    let point = state
        .index
        .get(id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound { entity_type: "memory".to_string(), id: params.id.clone() })?;
    Ok(hit_to_json(point))
}

pub async fn update(state: &AppState, params: UpdateParams) -> Result<Value, OrchestratorError> {
    let id = parse_uuid(&params.id)?;
    let sanitized_content = match &params.content {
        Some(content) => Some(scan_or_block(content)?),
        None => None,
    };

    let existing = state
        .index
        .get(id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound { entity_type: "memory".to_string(), id: params.id.clone() })?;

    if let Some(chunk_group_id) = existing.payload.get("chunk_group_id").and_then(Value::as_str) {
        return Err(OrchestratorError::ChunkMemberUpdate {
            id: params.id.clone(),
            chunk_group_id: chunk_group_id.to_string(),
        });
    }

    let metadata_overlay = metadata_fields(&params.metadata);

    if let Some(content) = sanitized_content {
        if params.reindex {
            let dual = state.embeddings.generate(&content).await?;
            let mut payload = existing.payload.as_object().cloned().unwrap_or_default();
            for (key, value) in metadata_overlay {
                payload.insert(key, value);
            }
            payload.insert("content".to_string(), Value::String(content));
            state
                .index
                .upsert(UpsertInput {
                    id: Some(id),
                    dense_small: dual.small,
                    dense_large: dual.large,
                    payload: Value::Object(payload),
                })
                .await?;
            return Ok(json!({ "id": id }));
        }

        let mut fields = metadata_overlay;
        fields.insert("content".to_string(), Value::String(content));
        state.index.update_payload(id, Value::Object(fields)).await?;
        return Ok(json!({ "id": id }));
    }

    state.index.update_payload(id, Value::Object(metadata_overlay)).await?;
    Ok(json!({ "id": id }))
}

pub async fn delete(state: &AppState, params: crate::params::DeleteParams) -> Result<Value, OrchestratorError> {
    let id = parse_uuid(&params.id)?;
    if state.index.get(id).await?.is_none() {
        return Err(OrchestratorError::NotFound { entity_type: "memory".to_string(), id: params.id.clone() });
    }
    state.index.delete(id).await?;
    Ok(json!({ "id": id }))
}

pub async fn batch_delete(state: &AppState, params: BatchDeleteParams) -> Result<Value, OrchestratorError> {
    let ids: Result<Vec<Uuid>, OrchestratorError> = params.ids.iter().map(|id| parse_uuid(id)).collect();
    let ids = ids?;
    state.index.batch_delete(&ids).await?;
    Ok(json!({ "deleted": ids.iter().map(Uuid::to_string).collect::<Vec<_>>() }))
}

pub async fn status(state: &AppState, params: StatusParams) -> Result<Value, OrchestratorError> {
    let stats = state.index.stats().await?;
    let mut out = json!({
        "points_count": stats.points_count,
        "indexed_vectors_count": stats.indexed_vectors_count,
        "segments_count": stats.segments_count,
        "status": stats.status,
        "optimizer_status": stats.optimizer_status,
        "access_tracking_failures": stats.access_tracking_failures,
    });

    if let Some(workspace) = params.workspace {
        let filters = SearchFilters { workspace: Some(workspace), ..Default::default() };
        let count = state.index.count(mem_index::build_filter(&filters)).await?;
        out["workspace_count"] = Value::from(count);
    }

    let mut by_type = Map::new();
    for memory_type in [MemoryType::LongTerm, MemoryType::Episodic, MemoryType::ShortTerm] {
        let filters = SearchFilters { memory_type: Some(memory_type), ..Default::default() };
        let count = state.index.count(mem_index::build_filter(&filters)).await?;
        by_type.insert(memory_type.as_str().to_string(), Value::from(count));
    }
    out["counts_by_memory_type"] = Value::Object(by_type);

    if params.include_embedding_stats {
        let embedding_stats = state.embeddings.stats();
        out["embedding_stats"] = json!({
            "total_requested": embedding_stats.total_requested,
            "cache_hits": embedding_stats.cache_hits,
            "cache_misses": embedding_stats.cache_misses,
            "hit_rate": embedding_stats.hit_rate(),
            "tokens_total": embedding_stats.tokens_total,
            "estimated_cost_usd": embedding_stats.estimated_cost_usd,
        });
    }

    Ok(out)
}

pub async fn count(state: &AppState, params: CountParams) -> Result<Value, OrchestratorError> {
    let filters: SearchFilters = params.filter.map(FilterParams::into).unwrap_or_default();
    let count = state.index.count(mem_index::build_filter(&filters)).await?;
    Ok(json!({ "count": count }))
}
