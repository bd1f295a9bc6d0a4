//! # mem-index
//!
//! The vector index controller (C4): collection lifecycle, hybrid
//! search via Reciprocal Rank Fusion, chunked writes, and best-effort
//! asynchronous access tracking, all against a `qdrant-client` backend.

pub mod access_tracking;
pub mod controller;
pub mod error;
pub mod filter;
pub mod hybrid;
pub mod schema;

pub use access_tracking::AccessTracker;
pub use controller::{
    BatchUpsertResult, FailedPoint, IndexStats, ScoredPoint, SearchInput, UpsertInput,
    VectorIndexController,
};
pub use error::IndexError;
pub use filter::build_filter;
pub use hybrid::{reciprocal_rank_fusion, FusedHit, RankedHit, RRF_K};
