// Region statistics endpoints

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{HeaderMap, Response, StatusCode};
use serde::Serialize;

use super::response::{internal_error, json_response, unauthorized};
use crate::config::AppState;
use crate::geography::RegionCount;
use crate::http;
use crate::logger;

#[derive(Serialize)]
struct RawRegions {
    regions: Vec<RegionCount>,
}

/// `GET /api/geography/markers`: never fails, worst case is the fallback entry
pub async fn handle_markers(state: &AppState) -> Response<Full<Bytes>> {
    let resolved = state.regions.resolve().await;
    json_response(StatusCode::OK, &resolved)
}

/// `GET /api/public/geography/regions`: bearer-gated database aggregation
pub async fn handle_public_regions(headers: &HeaderMap, state: &AppState) -> Response<Full<Bytes>> {
    let authorized = match (state.public_token.as_deref(), http::bearer_token(headers)) {
        (Some(expected), Some(given)) => !expected.is_empty() && expected == given,
        _ => false,
    };
    if !authorized {
        return unauthorized();
    }

    let Some(store) = state.regions.store() else {
        logger::log_error("Public regions requested but no region store is configured");
        return internal_error();
    };

    match store.region_counts().await {
        Ok(regions) => json_response(StatusCode::OK, &RawRegions { regions }),
        Err(e) => {
            logger::log_error(&format!("Public regions query failed: {e}"));
            internal_error()
        }
    }
}
