//! Collection lifecycle: create-or-validate the named-vector schema and
//! the payload indexes it depends on (§4.4 "Initialize").

use std::collections::HashMap;

use qdrant_client::qdrant::payload_index_params::IndexParams;
use qdrant_client::qdrant::quantization_config::Quantization;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigOneOf;
use qdrant_client::qdrant::{
    CreateCollection, Distance, FieldType, HnswConfigDiff, OptimizersConfigDiff,
    PayloadIndexParams, QuantizationConfig, ScalarQuantization, ScalarType, TextIndexParams,
    TokenizerType, VectorParams, VectorParamsMap, VectorsConfig,
};
use qdrant_client::Qdrant;

use crate::error::IndexError;

pub const HNSW_M: u64 = 16;
pub const HNSW_EF_CONSTRUCT: u64 = 200;
pub const HNSW_FULL_SCAN_THRESHOLD: u64 = 10_000;
pub const OPTIMIZER_DEFAULT_SEGMENT_NUMBER: u64 = 2;
pub const OPTIMIZER_MAX_SEGMENT_SIZE: u64 = 200_000;
pub const OPTIMIZER_MEMMAP_THRESHOLD: u64 = 50_000;
pub const OPTIMIZER_INDEXING_THRESHOLD: u64 = 20_000;
pub const OPTIMIZER_FLUSH_INTERVAL_SEC: u64 = 5;
pub const QUANTIZATION_QUANTILE: f32 = 0.99;

const DENSE: &str = "dense";
const DENSE_LARGE: &str = "dense_large";

const KEYWORD_FIELDS: &[&str] = &["workspace", "memory_type", "tags"];
const FLOAT_FIELDS: &[&str] = &["confidence"];
const INTEGER_FIELDS: &[&str] = &["access_count"];
const DATETIME_FIELDS: &[&str] = &["created_at", "updated_at", "last_accessed_at"];

/// Create the collection if absent, or validate it against the expected
/// schema if present. Fatal (`IndexError::SchemaMismatch`) on mismatch —
/// the process must not serve traffic against an incompatible collection.
pub async fn initialize(
    client: &Qdrant,
    collection_name: &str,
    dense_small_size: u64,
    dense_large_size: u64,
) -> Result<(), IndexError> {
    let exists = client
        .collection_exists(collection_name)
        .await
        .map_err(|e| IndexError::Connection(e.to_string()))?;

    if exists {
        validate_schema(client, collection_name, dense_small_size, dense_large_size).await?;
    } else {
        create_collection(client, collection_name, dense_small_size, dense_large_size).await?;
    }

    create_payload_indexes(client, collection_name).await?;
    Ok(())
}

async fn create_collection(
    client: &Qdrant,
    collection_name: &str,
    dense_small_size: u64,
    dense_large_size: u64,
) -> Result<(), IndexError> {
    let hnsw = HnswConfigDiff {
        m: Some(HNSW_M),
        ef_construct: Some(HNSW_EF_CONSTRUCT),
        full_scan_threshold: Some(HNSW_FULL_SCAN_THRESHOLD),
        ..Default::default()
    };
    let quantization = QuantizationConfig {
        quantization: Some(Quantization::Scalar(ScalarQuantization {
            r#type: ScalarType::Int8.into(),
            quantile: Some(QUANTIZATION_QUANTILE),
            always_ram: Some(true),
        })),
    };

    let mut map = HashMap::new();
    map.insert(
        DENSE.to_string(),
        VectorParams {
            size: dense_small_size,
            distance: Distance::Cosine.into(),
            hnsw_config: Some(hnsw.clone()),
            quantization_config: Some(quantization.clone()),
            ..Default::default()
        },
    );
    map.insert(
        DENSE_LARGE.to_string(),
        VectorParams {
            size: dense_large_size,
            distance: Distance::Cosine.into(),
            hnsw_config: Some(hnsw),
            quantization_config: Some(quantization),
            ..Default::default()
        },
    );

    let request = CreateCollection {
        collection_name: collection_name.to_string(),
        vectors_config: Some(VectorsConfig {
            config: Some(VectorsConfigOneOf::ParamsMap(VectorParamsMap { map })),
        }),
        optimizers_config: Some(OptimizersConfigDiff {
            default_segment_number: Some(OPTIMIZER_DEFAULT_SEGMENT_NUMBER),
            max_segment_size: Some(OPTIMIZER_MAX_SEGMENT_SIZE),
            memmap_threshold: Some(OPTIMIZER_MEMMAP_THRESHOLD),
            indexing_threshold: Some(OPTIMIZER_INDEXING_THRESHOLD),
            flush_interval_sec: Some(OPTIMIZER_FLUSH_INTERVAL_SEC),
            ..Default::default()
        }),
        ..Default::default()
    };

    client
        .create_collection(request)
        .await
        .map_err(|e| IndexError::Connection(e.to_string()))?;
    Ok(())
}

async fn validate_schema(
    client: &Qdrant,
    collection_name: &str,
    dense_small_size: u64,
    dense_large_size: u64,
) -> Result<(), IndexError> {
    let info = client
        .collection_info(collection_name)
        .await
        .map_err(|e| IndexError::Connection(e.to_string()))?;

    let mut mismatches = Vec::new();
    let params = info
        .result
        .as_ref()
        .and_then(|r| r.config.as_ref())
        .and_then(|c| c.params.as_ref())
        .and_then(|p| p.vectors_config.as_ref())
        .and_then(|v| v.config.as_ref());

    match params {
        Some(VectorsConfigOneOf::ParamsMap(map)) => {
            check_named_vector(&map.map, DENSE, dense_small_size, &mut mismatches);
            check_named_vector(&map.map, DENSE_LARGE, dense_large_size, &mut mismatches);
        }
        _ => mismatches.push(
            "collection uses a single unnamed vector space, expected named vectors \
             'dense' and 'dense_large'"
                .to_string(),
        ),
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(IndexError::SchemaMismatch(mismatches))
    }
}

fn check_named_vector(
    map: &HashMap<String, VectorParams>,
    name: &str,
    expected_size: u64,
    mismatches: &mut Vec<String>,
) {
    match map.get(name) {
        None => mismatches.push(format!("named vector '{name}' is missing")),
        Some(params) => {
            if params.size != expected_size {
                mismatches.push(format!(
                    "named vector '{name}' has size {} (expected {expected_size})",
                    params.size
                ));
            }
            if params.distance != i32::from(Distance::Cosine) {
                mismatches.push(format!("named vector '{name}' does not use Cosine distance"));
            }
        }
    }
}

async fn create_payload_indexes(client: &Qdrant, collection_name: &str) -> Result<(), IndexError> {
    for field in KEYWORD_FIELDS {
        create_field_index(client, collection_name, field, FieldType::Keyword, None).await?;
    }
    for field in FLOAT_FIELDS {
        create_field_index(client, collection_name, field, FieldType::Float, None).await?;
    }
    for field in INTEGER_FIELDS {
        create_field_index(client, collection_name, field, FieldType::Integer, None).await?;
    }
    for field in DATETIME_FIELDS {
        create_field_index(client, collection_name, field, FieldType::Datetime, None).await?;
    }

    let text_params = PayloadIndexParams {
        index_params: Some(IndexParams::TextIndexParams(TextIndexParams {
            tokenizer: TokenizerType::Word.into(),
            lowercase: Some(true),
            min_token_len: Some(2),
            max_token_len: Some(20),
            ..Default::default()
        })),
    };
    create_field_index(client, collection_name, "content", FieldType::Text, Some(text_params))
        .await?;

    Ok(())
}

async fn create_field_index(
    client: &Qdrant,
    collection_name: &str,
    field_name: &str,
    field_type: FieldType,
    params: Option<PayloadIndexParams>,
) -> Result<(), IndexError> {
    match client
        .create_field_index(
            qdrant_client::qdrant::CreateFieldIndexCollection {
                collection_name: collection_name.to_string(),
                field_name: field_name.to_string(),
                field_type: Some(field_type.into()),
                field_index_params: params,
                ..Default::default()
            },
        )
        .await
    {
        Ok(_) => Ok(()),
        Err(e) if e.to_string().contains("already exists") => Ok(()),
        Err(e) => Err(IndexError::Connection(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hnsw_constants_match_schema_spec() {
        assert_eq!(HNSW_M, 16);
        assert_eq!(HNSW_EF_CONSTRUCT, 200);
        assert_eq!(HNSW_FULL_SCAN_THRESHOLD, 10_000);
    }

    #[test]
    fn optimizer_constants_match_schema_spec() {
        assert_eq!(OPTIMIZER_DEFAULT_SEGMENT_NUMBER, 2);
        assert_eq!(OPTIMIZER_MAX_SEGMENT_SIZE, 200_000);
        assert_eq!(OPTIMIZER_MEMMAP_THRESHOLD, 50_000);
        assert_eq!(OPTIMIZER_INDEXING_THRESHOLD, 20_000);
        assert_eq!(OPTIMIZER_FLUSH_INTERVAL_SEC, 5);
    }

    #[test]
    fn check_named_vector_reports_missing() {
        let map = HashMap::new();
        let mut mismatches = Vec::new();
        check_named_vector(&map, "dense", 384, &mut mismatches);
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].contains("missing"));
    }

    #[test]
    fn check_named_vector_reports_size_mismatch() {
        let mut map = HashMap::new();
        map.insert(
            "dense".to_string(),
            VectorParams { size: 256, distance: Distance::Cosine.into(), ..Default::default() },
        );
        let mut mismatches = Vec::new();
        check_named_vector(&map, "dense", 384, &mut mismatches);
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].contains("size 256"));
    }

    #[test]
    fn check_named_vector_passes_when_matching() {
        let mut map = HashMap::new();
        map.insert(
            "dense".to_string(),
            VectorParams { size: 384, distance: Distance::Cosine.into(), ..Default::default() },
        );
        let mut mismatches = Vec::new();
        check_named_vector(&map, "dense", 384, &mut mismatches);
        assert!(mismatches.is_empty());
    }
}
