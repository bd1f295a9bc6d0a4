//! Fire-and-forget access-count bump on `search`/`hybrid search`/`get`
//! (§4.4 "Access tracking"). A read-modify-write without atomicity;
//! undercounting under concurrency is accepted.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use qdrant_client::qdrant::{GetPointsBuilder, PointId, SetPayloadPointsBuilder};
use qdrant_client::Qdrant;
use tracing::warn;

const WARNING_RATE_LIMIT: Duration = Duration::from_secs(10);

/// Tracks cumulative failures and throttles the warning log to once per
/// [`WARNING_RATE_LIMIT`] window.
pub struct AccessTracker {
    failures: AtomicU64,
    last_warned_at_millis: AtomicI64,
}

impl Default for AccessTracker {
    fn default() -> Self {
        Self { failures: AtomicU64::new(0), last_warned_at_millis: AtomicI64::new(0) }
    }
}

impl AccessTracker {
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Spawn a detached task that bumps `access_count`/`last_accessed_at`
    /// for every id in `ids`. Never awaited by the caller.
    pub fn track(self: &Arc<Self>, client: Arc<Qdrant>, collection_name: String, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = bump_access(&client, &collection_name, &ids).await {
                tracker.failures.fetch_add(1, Ordering::Relaxed);
                tracker.warn_rate_limited(&error);
            }
        });
    }

    fn warn_rate_limited(&self, error: &str) {
        let now = Utc::now().timestamp_millis();
        let last = self.last_warned_at_millis.load(Ordering::Relaxed);
        if now - last < WARNING_RATE_LIMIT.as_millis() as i64 {
            return;
        }
        if self
            .last_warned_at_millis
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            warn!(error, "access tracking failed");
        }
    }
}

async fn bump_access(
    client: &Qdrant,
    collection_name: &str,
    ids: &[String],
) -> Result<(), String> {
    let point_ids: Vec<PointId> = ids.iter().map(|id| id.clone().into()).collect();

    let current = client
        .get_points(GetPointsBuilder::new(collection_name, point_ids.clone()).with_payload(true))
        .await
        .map_err(|e| e.to_string())?;

    let now = Utc::now();
    for point in current.result {
        let id = match point.id {
            Some(id) => id,
            None => continue,
        };
        let access_count = point
            .payload
            .get("access_count")
            .and_then(|v| v.as_integer())
            .unwrap_or(0);

        let mut payload = qdrant_client::Payload::new();
        payload.insert("access_count", access_count + 1);
        payload.insert("last_accessed_at", now.to_rfc3339());

        client
            .set_payload(
                SetPayloadPointsBuilder::new(collection_name, payload)
                    .points_selector(vec![id])
                    .wait(false),
            )
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_zero_failures() {
        let tracker = AccessTracker::default();
        assert_eq!(tracker.failures(), 0);
    }

    #[test]
    fn track_with_no_ids_does_not_panic() {
        let tracker = Arc::new(AccessTracker::default());
        let client = Arc::new(Qdrant::from_url("http://localhost:6333").build().unwrap());
        tracker.track(client, "collection".to_string(), Vec::new());
    }
}
