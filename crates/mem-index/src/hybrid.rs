//! Reciprocal Rank Fusion (RRF) for hybrid search.
//!
//! Two independently ranked result lists (dense vector search, full-text
//! search) are merged by accumulating `1/(k + rank)` per id across
//! whichever lists it appears in (§4.4, testable property 6).

use std::collections::HashMap;

use serde_json::Value;

pub const RRF_K: u64 = 60;

#[derive(Debug, Clone)]
pub struct RankedHit {
    pub id: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub id: String,
    pub payload: Value,
    pub score: f64,
}

/// Fuse `dense` and `text` result lists, each already ranked best-first.
/// Ties preserve the dense list's payload on collision (§4.4 step 4:
/// "dense wins on collision").
#[must_use]
pub fn reciprocal_rank_fusion(dense: &[RankedHit], text: &[RankedHit], k: u64) -> Vec<FusedHit> {
    let mut scores: HashMap<&str, f64> = HashMap::new();
    let mut payloads: HashMap<&str, &Value> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for (rank, hit) in dense.iter().enumerate() {
        let r = rank as u64 + 1;
        *scores.entry(hit.id.as_str()).or_insert(0.0) += 1.0 / (k + r) as f64;
        payloads.entry(hit.id.as_str()).or_insert(&hit.payload);
        if !order.contains(&hit.id.as_str()) {
            order.push(hit.id.as_str());
        }
    }

    for (rank, hit) in text.iter().enumerate() {
        let r = rank as u64 + 1;
        *scores.entry(hit.id.as_str()).or_insert(0.0) += 1.0 / (k + r) as f64;
        payloads.entry(hit.id.as_str()).or_insert(&hit.payload);
        if !order.contains(&hit.id.as_str()) {
            order.push(hit.id.as_str());
        }
    }

    let mut fused: Vec<FusedHit> = order
        .into_iter()
        .map(|id| FusedHit { id: id.to_string(), payload: payloads[id].clone(), score: scores[id] })
        .collect();

    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str) -> RankedHit {
        RankedHit { id: id.to_string(), payload: Value::Null }
    }

    #[test]
    fn scenario_s4_tied_reciprocal_scores() {
        let dense = vec![hit("a"), hit("b")];
        let text = vec![hit("b"), hit("a")];

        let fused = reciprocal_rank_fusion(&dense, &text, 60);

        let a = fused.iter().find(|f| f.id == "a").unwrap();
        let b = fused.iter().find(|f| f.id == "b").unwrap();

        assert!((a.score - (1.0 / 61.0 + 1.0 / 62.0)).abs() < 1e-12);
        assert!((b.score - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
        assert!((a.score - b.score).abs() < 1e-12, "both should tie");
    }

    #[test]
    fn id_present_in_only_one_list_gets_only_that_term() {
        let dense = vec![hit("only-dense")];
        let text: Vec<RankedHit> = vec![];

        let fused = reciprocal_rank_fusion(&dense, &text, 60);

        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn dense_payload_wins_on_collision() {
        let dense = vec![RankedHit { id: "x".to_string(), payload: serde_json::json!({"src": "dense"}) }];
        let text = vec![RankedHit { id: "x".to_string(), payload: serde_json::json!({"src": "text"}) }];

        let fused = reciprocal_rank_fusion(&dense, &text, 60);

        assert_eq!(fused[0].payload, serde_json::json!({"src": "dense"}));
    }

    #[test]
    fn sorted_descending_by_combined_score() {
        let dense = vec![hit("top"), hit("mid")];
        let text = vec![hit("top")];

        let fused = reciprocal_rank_fusion(&dense, &text, 60);

        assert_eq!(fused[0].id, "top");
        assert!(fused[0].score > fused[1].score);
    }
}
