//! Filter builder: translates a [`mem_core::SearchFilters`] into the
//! index's AND-of-conditions, always appending the expiry exclusion.

use chrono::Utc;
use mem_core::SearchFilters;
use qdrant_client::qdrant::condition::ConditionOneOf;
use qdrant_client::qdrant::r#match::MatchValue;
use qdrant_client::qdrant::{Condition, FieldCondition, Filter, Match, Range};
use serde_json::Value;

/// Build the AND-of-conditions filter. Returns `None` iff no conditions
/// apply at all — which cannot happen here because the expiry exclusion
/// is always appended, but callers treat an empty `Filter` the same way.
#[must_use]
pub fn build_filter(filters: &SearchFilters) -> Filter {
    let mut must = Vec::new();

    if let Some(workspace) = &filters.workspace {
        must.push(keyword_condition("workspace", workspace));
    }
    if let Some(memory_type) = filters.memory_type {
        must.push(keyword_condition("memory_type", memory_type.as_str()));
    }
    if let Some(min_confidence) = filters.min_confidence {
        must.push(Condition {
            condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                key: "confidence".to_string(),
                range: Some(Range { gte: Some(min_confidence), ..Default::default() }),
                ..Default::default()
            })),
        });
    }
    if !filters.tags.is_empty() {
        must.push(Condition {
            condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                key: "tags".to_string(),
                r#match: Some(Match {
                    match_value: Some(MatchValue::Keywords(qdrant_client::qdrant::RepeatedStrings {
                        strings: filters.tags.clone(),
                    })),
                }),
                ..Default::default()
            })),
        });
    }
    for (key, value) in &filters.metadata {
        must.push(metadata_condition(key, value));
    }

    must.push(expiry_exclusion());

    Filter { must, ..Default::default() }
}

/// `expires_at` is absent OR `expires_at > now`.
fn expiry_exclusion() -> Condition {
    let now = Utc::now().timestamp();
    let is_null = Condition {
        condition_one_of: Some(ConditionOneOf::IsNull(qdrant_client::qdrant::IsNullCondition {
            key: "expires_at".to_string(),
        })),
    };
    let after_now = Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: "expires_at".to_string(),
            range: Some(Range { gt: Some(now as f64), ..Default::default() }),
            ..Default::default()
        })),
    };
    Condition {
        condition_one_of: Some(ConditionOneOf::Filter(Filter {
            should: vec![is_null, after_now],
            ..Default::default()
        })),
    }
}

fn keyword_condition(key: &str, value: &str) -> Condition {
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: key.to_string(),
            r#match: Some(Match { match_value: Some(MatchValue::Keyword(value.to_string())) }),
            ..Default::default()
        })),
    }
}

/// Equality on an arbitrary caller-supplied metadata value. Strings and
/// booleans and integers map to their native match kind; anything else
/// (floats, arrays, objects) falls back to matching its JSON text form.
fn metadata_condition(key: &str, value: &Value) -> Condition {
    let match_value = match value {
        Value::String(s) => MatchValue::Keyword(s.clone()),
        Value::Bool(b) => MatchValue::Boolean(*b),
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            MatchValue::Integer(n.as_i64().unwrap_or_default())
        }
        other => MatchValue::Keyword(other.to_string()),
    };
    Condition {
        condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
            key: key.to_string(),
            r#match: Some(Match { match_value: Some(match_value) }),
            ..Default::default()
        })),
    }
}

#[cfg(test)]
mod tests {
    use mem_core::MemoryType;

    use super::*;

    #[test]
    fn always_includes_expiry_exclusion() {
        let filters = SearchFilters::default();
        let filter = build_filter(&filters);
        assert_eq!(filter.must.len(), 1, "only the expiry exclusion should be present");
    }

    #[test]
    fn workspace_and_memory_type_add_must_conditions() {
        let filters = SearchFilters {
            workspace: Some("proj".to_string()),
            memory_type: Some(MemoryType::Episodic),
            ..Default::default()
        };
        let filter = build_filter(&filters);
        assert_eq!(filter.must.len(), 3);
    }

    #[test]
    fn min_confidence_adds_range_condition() {
        let filters = SearchFilters { min_confidence: Some(0.5), ..Default::default() };
        let filter = build_filter(&filters);
        assert_eq!(filter.must.len(), 2);
    }

    #[test]
    fn tags_add_match_any_condition() {
        let filters = SearchFilters { tags: vec!["a".to_string(), "b".to_string()], ..Default::default() };
        let filter = build_filter(&filters);
        assert_eq!(filter.must.len(), 2);
    }

    #[test]
    fn metadata_pairs_add_one_condition_each() {
        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("project".to_string(), serde_json::json!("zenith"));
        metadata.insert("priority".to_string(), serde_json::json!(2));
        let filters = SearchFilters { metadata, ..Default::default() };
        let filter = build_filter(&filters);
        assert_eq!(filter.must.len(), 3);
    }
}
