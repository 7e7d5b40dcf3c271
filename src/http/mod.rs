//! HTTP protocol layer module
//!
//! Response builders, caching helpers and request header utilities shared by
//! the static site and the API handlers.

pub mod cache;
pub mod mime;
pub mod response;

use hyper::HeaderMap;

// Re-export commonly used types
pub use response::{
    build_304_response, build_404_response, build_413_response, build_cached_response,
    build_health_response, build_options_response, build_site_405_response,
};

/// Header value as a string, if present and visible ASCII
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Client address for rate limiting and logs.
///
/// First entry of `X-Forwarded-For`, else `X-Real-IP`, else `"unknown"`.
pub fn client_address(headers: &HeaderMap) -> String {
    if let Some(first) = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    header_str(headers, "x-real-ip")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| "unknown".to_string(), ToString::to_string)
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, "authorization").and_then(|v| v.strip_prefix("Bearer "))
}
