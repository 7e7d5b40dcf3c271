//! Region aggregation over the user database

use futures::future::BoxFuture;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::normalize::MAX_REGIONS;
use super::SourceError;
use crate::config::GeographyConfig;

/// One grouped row: how many users carry a region code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionCount {
    pub region_code: String,
    pub count: i64,
}

impl RegionCount {
    pub fn new(region_code: &str, count: i64) -> Self {
        Self {
            region_code: region_code.to_string(),
            count,
        }
    }
}

/// Source of per-region user counts, most populous first
pub trait RegionStore: Send + Sync {
    fn region_counts(&self) -> BoxFuture<'_, Result<Vec<RegionCount>, SourceError>>;
}

/// Pipeline over the users collection.
///
/// `regionCode` is converted to a string (unconvertible values become null),
/// only one or two digit codes are kept, single digits gain a leading zero,
/// and the result is grouped, counted and sorted by count descending.
pub fn region_pipeline() -> Vec<Document> {
    let limit = i64::try_from(MAX_REGIONS).unwrap_or(i64::MAX);
    vec![
        doc! {
            "$project": {
                "regionCode": {
                    "$convert": {
                        "input": "$regionCode",
                        "to": "string",
                        "onError": null,
                        "onNull": null
                    }
                }
            }
        },
        doc! { "$match": { "regionCode": { "$regex": "^[0-9]{1,2}$" } } },
        doc! {
            "$project": {
                "regionCode": {
                    "$cond": [
                        { "$eq": [{ "$strLenCP": "$regionCode" }, 1] },
                        { "$concat": ["0", "$regionCode"] },
                        "$regionCode"
                    ]
                }
            }
        },
        doc! { "$group": { "_id": "$regionCode", "count": { "$sum": 1 } } },
        doc! { "$project": { "_id": 0, "regionCode": "$_id", "count": 1 } },
        doc! { "$sort": { "count": -1, "regionCode": 1 } },
        doc! { "$limit": limit },
    ]
}

/// MongoDB-backed store. The client is created once and pools connections.
pub struct MongoRegionStore {
    users: Collection<Document>,
    timeout: Duration,
}

impl MongoRegionStore {
    pub async fn connect(uri: &str, cfg: &GeographyConfig) -> Result<Self, SourceError> {
        let client = Client::with_uri_str(uri).await?;
        let users = client
            .database(&cfg.mongodb_db)
            .collection::<Document>(&cfg.users_collection);
        Ok(Self {
            users,
            timeout: Duration::from_millis(cfg.timeout_ms),
        })
    }

    async fn aggregate(&self) -> Result<Vec<RegionCount>, SourceError> {
        let mut cursor = self.users.aggregate(region_pipeline(), None).await?;
        let mut rows = Vec::new();
        while let Some(row) = cursor.try_next().await? {
            rows.push(bson::from_document::<RegionCount>(row)?);
        }
        Ok(rows)
    }
}

impl RegionStore for MongoRegionStore {
    fn region_counts(&self) -> BoxFuture<'_, Result<Vec<RegionCount>, SourceError>> {
        Box::pin(async move {
            tokio::time::timeout(self.timeout, self.aggregate())
                .await
                .map_err(|_| SourceError::Timeout(self.timeout))?
        })
    }
}
