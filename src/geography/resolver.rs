//! Region statistics fallback chain
//!
//! upstream HTTP → database aggregation → static fallback. Each stage returns
//! an explicit `Result`; the chain stops at the first non-empty answer.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::normalize::{normalize_counts, parse_upstream_payload, RegionStat};
use super::store::RegionStore;
use super::upstream::UpstreamSource;
use super::SourceError;
use crate::logger;

/// Which stage answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionSource {
    Upstream,
    Mongo,
    Fallback,
}

impl fmt::Display for RegionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upstream => "upstream",
            Self::Mongo => "mongo",
            Self::Fallback => "fallback",
        })
    }
}

/// Never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRegions {
    pub regions: Vec<RegionStat>,
    pub source: RegionSource,
}

/// The static answer when nothing else is available
pub fn fallback_regions() -> Vec<RegionStat> {
    vec![RegionStat {
        region_code: "38".to_string(),
        label: "Иркутская область".to_string(),
        count: 1,
    }]
}

#[derive(Clone, Default)]
pub struct RegionResolver {
    upstream: Option<Arc<dyn UpstreamSource>>,
    store: Option<Arc<dyn RegionStore>>,
}

impl RegionResolver {
    pub fn new(
        upstream: Option<Arc<dyn UpstreamSource>>,
        store: Option<Arc<dyn RegionStore>>,
    ) -> Self {
        Self { upstream, store }
    }

    pub fn store(&self) -> Option<&Arc<dyn RegionStore>> {
        self.store.as_ref()
    }

    pub async fn resolve(&self) -> ResolvedRegions {
        if let Some(regions) = accept(RegionSource::Upstream, self.from_upstream().await) {
            return ResolvedRegions {
                regions,
                source: RegionSource::Upstream,
            };
        }

        if let Some(regions) = accept(RegionSource::Mongo, self.from_store().await) {
            return ResolvedRegions {
                regions,
                source: RegionSource::Mongo,
            };
        }

        ResolvedRegions {
            regions: fallback_regions(),
            source: RegionSource::Fallback,
        }
    }

    pub async fn from_upstream(&self) -> Result<Vec<RegionStat>, SourceError> {
        let upstream = self.upstream.as_ref().ok_or(SourceError::NotConfigured)?;
        let payload = upstream.fetch().await?;
        Ok(parse_upstream_payload(&payload))
    }

    pub async fn from_store(&self) -> Result<Vec<RegionStat>, SourceError> {
        let store = self.store.as_ref().ok_or(SourceError::NotConfigured)?;
        let rows = store.region_counts().await?;
        Ok(normalize_counts(&rows))
    }
}

/// Keep a stage's answer only if it is usable, logging why not otherwise
fn accept(stage: RegionSource, result: Result<Vec<RegionStat>, SourceError>) -> Option<Vec<RegionStat>> {
    match result {
        Ok(regions) if !regions.is_empty() => {
            logger::log_debug(&format!("Regions from {stage}: {} entries", regions.len()));
            Some(regions)
        }
        Ok(_) => {
            logger::log_warning(&format!("Region source {stage} returned no usable entries"));
            None
        }
        Err(SourceError::NotConfigured) => None,
        Err(e) => {
            logger::log_warning(&format!("Region source {stage} failed: {e}"));
            None
        }
    }
}
