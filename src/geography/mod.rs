//! Region statistics for the geography map
//!
//! Resolves "users per region" from the best available source and serves the
//! raw database aggregation to authorized consumers.

pub mod normalize;
pub mod regions;
pub mod resolver;
pub mod store;
pub mod upstream;

use std::time::Duration;
use thiserror::Error;

pub use resolver::RegionResolver;
pub use store::{MongoRegionStore, RegionCount, RegionStore};
pub use upstream::{HttpUpstream, UpstreamSource};

/// Why an optional region source produced nothing
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source not configured")]
    NotConfigured,

    #[error("upstream answered HTTP {0}")]
    Status(u16),

    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("unexpected database row: {0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}
