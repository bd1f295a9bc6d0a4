//! The vector index controller (C4): owns the Qdrant collection and
//! exposes upsert/search/hybrid-search/get/delete/count/list/stats.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use qdrant_client::qdrant::{
    CountPointsBuilder, DeletePointsBuilder, Filter, GetPointsBuilder, PointId, PointStruct,
    PointsIdsList, ScrollPointsBuilder, SearchPointsBuilder, SetPayloadPointsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::access_tracking::AccessTracker;
use crate::error::IndexError;
use crate::hybrid::{reciprocal_rank_fusion, FusedHit, RankedHit, RRF_K};
use crate::schema;

const DENSE: &str = "dense";
const DENSE_LARGE: &str = "dense_large";
const BATCH_SIZE: usize = 500;
const DEFAULT_HNSW_EF: u64 = 128;

#[derive(Debug, Clone)]
pub struct FailedPoint {
    pub index: usize,
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct BatchUpsertResult {
    pub successful_ids: Vec<String>,
    pub failed_points: Vec<FailedPoint>,
    pub total_processed: usize,
}

#[derive(Debug, Clone)]
pub struct UpsertInput {
    pub id: Option<Uuid>,
    pub dense_small: Vec<f32>,
    pub dense_large: Vec<f32>,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct SearchInput {
    pub vector: Vec<f32>,
    pub large_vector: Option<Vec<f32>>,
    pub filter: Filter,
    pub limit: u64,
    pub offset: u64,
    pub score_threshold: Option<f32>,
    pub hnsw_ef: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct IndexStats {
    pub points_count: u64,
    pub indexed_vectors_count: u64,
    pub segments_count: u64,
    pub status: String,
    pub optimizer_status: String,
    pub access_tracking_failures: u64,
}

pub struct VectorIndexController {
    client: Arc<Qdrant>,
    collection_name: String,
    dense_small_size: u64,
    dense_large_size: u64,
    init: tokio::sync::OnceCell<()>,
    access_tracker: Arc<AccessTracker>,
}

impl VectorIndexController {
    #[must_use]
    pub fn new(
        client: Qdrant,
        collection_name: String,
        dense_small_size: u64,
        dense_large_size: u64,
    ) -> Self {
        Self {
            client: Arc::new(client),
            collection_name,
            dense_small_size,
            dense_large_size,
            init: tokio::sync::OnceCell::new(),
            access_tracker: Arc::new(AccessTracker::default()),
        }
    }

    /// Idempotent: concurrent callers share one initialization attempt.
    pub async fn initialize(&self) -> Result<(), IndexError> {
        self.init
            .get_or_try_init(|| async {
                schema::initialize(
                    &self.client,
                    &self.collection_name,
                    self.dense_small_size,
                    self.dense_large_size,
                )
                .await
            })
            .await?;
        Ok(())
    }

    pub async fn upsert(&self, input: UpsertInput) -> Result<String, IndexError> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let payload = merge_defaults(input.payload, Utc::now());
        let point = build_point(id, &input.dense_small, &input.dense_large, payload)?;

        self.client
            .upsert_points(
                qdrant_client::qdrant::UpsertPointsBuilder::new(&self.collection_name, vec![point])
                    .wait(true),
            )
            .await
            .map_err(|e| IndexError::Query(e.to_string()))?;

        Ok(id.to_string())
    }

    pub async fn batch_upsert(&self, inputs: Vec<UpsertInput>) -> Result<BatchUpsertResult, IndexError> {
        let mut successful_ids = Vec::new();
        let mut failed_points = Vec::new();
        let total_processed = inputs.len();

        for (batch_index, batch) in inputs.into_iter().collect::<Vec<_>>().chunks(BATCH_SIZE).enumerate().map(|(i, c)| (i, c.to_vec())).collect::<Vec<_>>() {
            let ids: Vec<Uuid> = batch.iter().map(|i| i.id.unwrap_or_else(Uuid::new_v4)).collect();
            let mut points = Vec::with_capacity(batch.len());
            let mut build_error = None;
            for (input, id) in batch.iter().zip(ids.iter()) {
                let payload = merge_defaults(input.payload.clone(), Utc::now());
                match build_point(*id, &input.dense_small, &input.dense_large, payload) {
                    Ok(point) => points.push(point),
                    Err(error) => {
                        build_error = Some(error);
                        break;
                    }
                }
            }

            if let Some(error) = build_error {
                for (offset, id) in ids.iter().enumerate() {
                    failed_points.push(FailedPoint {
                        index: batch_index * BATCH_SIZE + offset,
                        id: id.to_string(),
                        error: error.to_string(),
                    });
                }
                continue;
            }

            match self
                .client
                .upsert_points(
                    qdrant_client::qdrant::UpsertPointsBuilder::new(&self.collection_name, points)
                        .wait(true),
                )
                .await
            {
                Ok(_) => successful_ids.extend(ids.iter().map(Uuid::to_string)),
                Err(error) => {
                    for (offset, id) in ids.iter().enumerate() {
                        failed_points.push(FailedPoint {
                            index: batch_index * BATCH_SIZE + offset,
                            id: id.to_string(),
                            error: error.to_string(),
                        });
                    }
                }
            }

            let percent = 100.0 * successful_ids.len() as f64 / total_processed.max(1) as f64;
            info!(batch_index, percent, "batch upsert progress");
        }

        Ok(BatchUpsertResult { successful_ids, failed_points, total_processed })
    }

    pub async fn search(&self, input: SearchInput) -> Result<Vec<ScoredPoint>, IndexError> {
        let (vector_name, vector) = match &input.large_vector {
            Some(large) => (DENSE_LARGE, large.clone()),
            None => (DENSE, input.vector.clone()),
        };

        let mut builder = SearchPointsBuilder::new(&self.collection_name, vector, input.limit)
            .vector_name(vector_name)
            .filter(input.filter)
            .offset(input.offset)
            .with_payload(true)
            .hnsw_ef(input.hnsw_ef.unwrap_or(DEFAULT_HNSW_EF))
            .indexed_only(true);
        if let Some(threshold) = input.score_threshold {
            builder = builder.score_threshold(threshold);
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| IndexError::Query(e.to_string()))?;

        let hits: Vec<ScoredPoint> = response
            .result
            .into_iter()
            .map(|point| ScoredPoint {
                id: point_id_to_string(point.id),
                score: point.score,
                payload: payload_to_json(point.payload),
            })
            .collect();

        self.access_tracker.track(
            Arc::clone(&self.client),
            self.collection_name.clone(),
            hits.iter().map(|h| h.id.clone()).collect(),
        );

        Ok(hits)
    }

    /// Combines dense and full-text scroll results via RRF (§4.4 step 1-6).
    pub async fn hybrid_search(
        &self,
        text_query: &str,
        mut input: SearchInput,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        let fetch_limit = input.limit.saturating_mul(3);
        let offset = input.offset;
        let limit = input.limit;
        input.limit = fetch_limit;
        input.offset = 0;
        let filter = input.filter.clone();

        let dense_hits = self.search(input).await?;
        let text_hits = self.scroll_text_match(&filter, text_query, fetch_limit).await?;

        let dense_ranked: Vec<RankedHit> = dense_hits
            .iter()
            .map(|h| RankedHit { id: h.id.clone(), payload: h.payload.clone() })
            .collect();
        let text_ranked: Vec<RankedHit> =
            text_hits.iter().map(|h| RankedHit { id: h.id.clone(), payload: h.payload.clone() }).collect();

        let fused: Vec<FusedHit> = reciprocal_rank_fusion(&dense_ranked, &text_ranked, RRF_K);
        let page: Vec<ScoredPoint> = fused
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|f| ScoredPoint { id: f.id, score: f.score as f32, payload: f.payload })
            .collect();

        self.access_tracker.track(
            Arc::clone(&self.client),
            self.collection_name.clone(),
            page.iter().map(|h| h.id.clone()).collect(),
        );

        Ok(page)
    }

    async fn scroll_text_match(
        &self,
        filter: &Filter,
        query: &str,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        let mut combined = filter.clone();
        combined.must.push(qdrant_client::qdrant::Condition {
            condition_one_of: Some(qdrant_client::qdrant::condition::ConditionOneOf::Field(
                qdrant_client::qdrant::FieldCondition {
                    key: "content".to_string(),
                    r#match: Some(qdrant_client::qdrant::Match {
                        match_value: Some(qdrant_client::qdrant::r#match::MatchValue::Text(
                            query.to_string(),
                        )),
                    }),
                    ..Default::default()
                },
            )),
        });

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection_name)
                    .filter(combined)
                    .limit(limit as u32)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| IndexError::Query(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| ScoredPoint {
                id: point_id_to_string(point.id),
                score: 0.0,
                payload: payload_to_json(point.payload),
            })
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ScoredPoint>, IndexError> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection_name, vec![id.to_string().into()])
                    .with_payload(true),
            )
            .await
            .map_err(|e| IndexError::Query(e.to_string()))?;

        let Some(point) = response.result.into_iter().next() else {
            return Ok(None);
        };
        let hit = ScoredPoint {
            id: point_id_to_string(point.id),
            score: 1.0,
            payload: payload_to_json(point.payload),
        };

        self.access_tracker.track(
            Arc::clone(&self.client),
            self.collection_name.clone(),
            vec![hit.id.clone()],
        );

        Ok(Some(hit))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), IndexError> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection_name)
                    .points(PointsIdsList { ids: vec![id.to_string().into()] })
                    .wait(true),
            )
            .await
            .map_err(|e| IndexError::Query(e.to_string()))?;
        Ok(())
    }

    pub async fn batch_delete(&self, ids: &[Uuid]) -> Result<(), IndexError> {
        let ids: Vec<PointId> = ids.iter().map(|id| id.to_string().into()).collect();
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection_name)
                    .points(PointsIdsList { ids })
                    .wait(true),
            )
            .await
            .map_err(|e| IndexError::Query(e.to_string()))?;
        Ok(())
    }

    pub async fn count(&self, filter: Filter) -> Result<u64, IndexError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection_name).filter(filter).exact(true))
            .await
            .map_err(|e| IndexError::Query(e.to_string()))?;
        Ok(response.result.map_or(0, |r| r.count))
    }

    /// `offset` is a row-skip count, not a Qdrant scroll cursor: `scroll`'s
    /// own `offset` field resumes after a point id, which is useless for
    /// caller-facing pagination, so this fetches `offset + limit` rows from
    /// the start and slices locally.
    pub async fn list(&self, filter: Filter, limit: u64, offset: u64) -> Result<Vec<ScoredPoint>, IndexError> {
        let fetch = offset.saturating_add(limit);
        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection_name)
                    .filter(filter)
                    .limit(fetch as u32)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| IndexError::Query(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .skip(offset as usize)
            .map(|point| ScoredPoint {
                id: point_id_to_string(point.id),
                score: 1.0,
                payload: payload_to_json(point.payload),
            })
            .collect())
    }

    pub async fn update_payload(&self, id: Uuid, fields: Value) -> Result<(), IndexError> {
        let mut merged = fields;
        if let Value::Object(ref mut map) = merged {
            map.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        let payload = json_to_payload(&merged);

        self.client
            .set_payload(
                SetPayloadPointsBuilder::new(&self.collection_name, payload)
                    .points_selector(vec![id.to_string().into()])
                    .wait(true),
            )
            .await
            .map_err(|e| IndexError::Query(e.to_string()))?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<IndexStats, IndexError> {
        let info = self
            .client
            .collection_info(&self.collection_name)
            .await
            .map_err(|e| IndexError::Connection(e.to_string()))?;
        let result = info.result.unwrap_or_default();

        Ok(IndexStats {
            points_count: result.points_count.unwrap_or(0),
            indexed_vectors_count: result.indexed_vectors_count.unwrap_or(0),
            segments_count: result.segments_count,
            status: result.status().as_str_name().to_string(),
            optimizer_status: result
                .optimizer_status
                .map(|s| format!("{s:?}"))
                .unwrap_or_default(),
            access_tracking_failures: self.access_tracker.failures(),
        })
    }
}

fn merge_defaults(payload: Value, now: chrono::DateTime<Utc>) -> Value {
    let mut map = match payload {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    map.entry("created_at").or_insert_with(|| Value::String(now.to_rfc3339()));
    map.insert("updated_at".to_string(), Value::String(now.to_rfc3339()));
    map.entry("memory_type").or_insert_with(|| Value::String("long-term".to_string()));
    map.entry("confidence").or_insert(Value::from(0.7));
    map.entry("access_count").or_insert(Value::from(0));
    map.entry("last_accessed_at").or_insert(Value::Null);
    Value::Object(map)
}

fn build_point(
    id: Uuid,
    dense_small: &[f32],
    dense_large: &[f32],
    payload: Value,
) -> Result<PointStruct, IndexError> {
    let mut vectors: HashMap<String, Vec<f32>> = HashMap::new();
    vectors.insert(DENSE.to_string(), dense_small.to_vec());
    vectors.insert(DENSE_LARGE.to_string(), dense_large.to_vec());

    Ok(PointStruct::new(id.to_string(), vectors, json_to_payload(&payload)))
}

fn json_to_payload(value: &Value) -> Payload {
    let Value::Object(map) = value else {
        return Payload::new();
    };
    let mut payload = Payload::new();
    for (key, value) in map {
        payload.insert(key.clone(), value.clone());
    }
    payload
}

fn payload_to_json(payload: HashMap<String, qdrant_client::qdrant::Value>) -> Value {
    let mut map = serde_json::Map::new();
    for (key, value) in payload {
        map.insert(key, qdrant_value_to_json(value));
    }
    Value::Object(map)
}

fn qdrant_value_to_json(value: qdrant_client::qdrant::Value) -> Value {
    serde_json::to_value(&value).unwrap_or(Value::Null)
}

fn point_id_to_string(id: Option<PointId>) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions;
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(s)) => s,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_defaults_sets_long_term_memory_type() {
        let merged = merge_defaults(serde_json::json!({}), Utc::now());
        assert_eq!(merged["memory_type"], "long-term");
        assert_eq!(merged["confidence"], 0.7);
        assert_eq!(merged["access_count"], 0);
    }

    #[test]
    fn merge_defaults_preserves_caller_supplied_memory_type() {
        let merged = merge_defaults(serde_json::json!({"memory_type": "episodic"}), Utc::now());
        assert_eq!(merged["memory_type"], "episodic");
    }

    #[test]
    fn point_id_to_string_extracts_bare_uuid() {
        use qdrant_client::qdrant::point_id::PointIdOptions;
        let id = PointId { point_id_options: Some(PointIdOptions::Uuid("abc-123".to_string())) };
        assert_eq!(point_id_to_string(Some(id)), "abc-123");
    }

    #[test]
    fn point_id_to_string_extracts_numeric_id() {
        use qdrant_client::qdrant::point_id::PointIdOptions;
        let id = PointId { point_id_options: Some(PointIdOptions::Num(42)) };
        assert_eq!(point_id_to_string(Some(id)), "42");
    }

    #[test]
    fn point_id_to_string_empty_on_absent_options() {
        assert_eq!(point_id_to_string(None), "");
    }
}
