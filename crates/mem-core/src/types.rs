//! The Memory Point data model (§3).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Classifies a memory's retention policy and default expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryType {
    LongTerm,
    Episodic,
    ShortTerm,
}

impl MemoryType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LongTerm => "long-term",
            Self::Episodic => "episodic",
            Self::ShortTerm => "short-term",
        }
    }

    /// The retention window added to `created_at` when `expires_at` is
    /// absent. `None` for `long-term`, which never expires.
    #[must_use]
    pub fn default_ttl(self) -> Option<chrono::Duration> {
        match self {
            Self::LongTerm => None,
            Self::Episodic => Some(chrono::Duration::days(90)),
            Self::ShortTerm => Some(chrono::Duration::days(7)),
        }
    }
}

impl Default for MemoryType {
    fn default() -> Self {
        Self::LongTerm
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata present on a chunk member, iff the point is one window of a
/// chunked document. All three fields travel together (§3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChunkInfo {
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub chunk_group_id: Uuid,
}

/// The atomic stored record. `extra` is the open bag of caller-supplied
/// fields that round-trip through the index unchanged (§9 "dynamic payload
/// fields"); it never shadows a typed field.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MemoryPoint {
    pub id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    pub memory_type: MemoryType,
    pub confidence: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub chunk: Option<ChunkInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl MemoryPoint {
    /// A point is a chunk member iff all three chunk fields are present;
    /// this accessor is the single place that relies on that invariant.
    #[must_use]
    pub const fn chunk_group_id(&self) -> Option<Uuid> {
        match &self.chunk {
            Some(chunk) => Some(chunk.chunk_group_id),
            None => None,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_type_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&MemoryType::LongTerm).unwrap(),
            "\"long-term\""
        );
        assert_eq!(
            serde_json::to_string(&MemoryType::ShortTerm).unwrap(),
            "\"short-term\""
        );
    }

    #[test]
    fn long_term_has_no_default_ttl() {
        assert!(MemoryType::LongTerm.default_ttl().is_none());
    }

    #[test]
    fn episodic_ttl_is_ninety_days() {
        assert_eq!(
            MemoryType::Episodic.default_ttl(),
            Some(chrono::Duration::days(90))
        );
    }

    #[test]
    fn is_expired_respects_absent_expiry() {
        let point = sample_point(None);
        assert!(!point.is_expired(Utc::now()));
    }

    #[test]
    fn is_expired_true_when_past() {
        let point = sample_point(Some(Utc::now() - chrono::Duration::seconds(1)));
        assert!(point.is_expired(Utc::now()));
    }

    fn sample_point(expires_at: Option<DateTime<Utc>>) -> MemoryPoint {
        let now = Utc::now();
        MemoryPoint {
            id: Uuid::new_v4(),
            content: "hi".to_string(),
            workspace: None,
            memory_type: MemoryType::LongTerm,
            confidence: 0.7,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            expires_at,
            access_count: 0,
            last_accessed_at: None,
            chunk: None,
            extra: BTreeMap::new(),
        }
    }
}
