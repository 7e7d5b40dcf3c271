//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: size check, route matching,
//! dispatch, and access logging.

use crate::api;
use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::HeaderValue;
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// What the static file layer needs from a request
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let started = Instant::now();
    let entry = state
        .access_log_enabled()
        .then(|| access_entry(&req, peer_addr));

    let mut response = route_request(req, &state).await;
    finalize_headers(&mut response, &state);

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on method and path
async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let is_api = is_api_path(req.uri().path());

    // 1. Preflight
    if req.method() == Method::OPTIONS {
        return http::build_options_response(state.config.http.enable_cors);
    }

    // 2. Declared body size
    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size, is_api) {
        return resp;
    }

    // 3. Health check endpoints (always fast)
    let health = &state.config.health;
    let is_read = matches!(*req.method(), Method::GET | Method::HEAD);
    if health.enabled
        && is_read
        && (req.uri().path() == health.liveness_path || req.uri().path() == health.readiness_path)
    {
        return http::build_health_response("ok");
    }

    // 4. JSON API
    if is_api {
        return api::handle_api(req, state).await;
    }

    // 5. Landing site
    if !is_read {
        logger::log_debug(&format!("Method not allowed: {} {}", req.method(), req.uri().path()));
        return http::build_site_405_response();
    }

    let ctx = RequestContext {
        path: req.uri().path(),
        is_head: *req.method() == Method::HEAD,
        if_none_match: http::header_str(req.headers(), "if-none-match").map(ToString::to_string),
    };
    static_files::serve_site(&ctx, &state.config.site.root, &state.config.site.index_files).await
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Reject a declared Content-Length above the limit before reading anything
fn check_body_size<B>(
    req: &Request<B>,
    max_body_size: u64,
    is_api: bool,
) -> Option<Response<Full<Bytes>>> {
    let size_str = http::header_str(req.headers(), "content-length")?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(if is_api {
                api::payload_too_large()
            } else {
                http::build_413_response()
            })
        }
        Ok(_) => None,
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
    }
}

fn finalize_headers(response: &mut Response<Full<Bytes>>, state: &AppState) {
    let headers = response.headers_mut();
    if let Ok(name) = HeaderValue::from_str(&state.config.http.server_name) {
        headers.insert("Server", name);
    }
    if state.config.http.enable_cors {
        headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    }
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let forwarded = http::client_address(req.headers());
    let remote_addr = if forwarded == "unknown" {
        peer_addr.ip().to_string()
    } else {
        forwarded
    };

    let mut entry = AccessLogEntry::new(
        remote_addr,
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.http_version = match req.version() {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        _ => "1.1",
    }
    .to_string();
    entry.referer = http::header_str(req.headers(), "referer").map(ToString::to_string);
    entry.user_agent = http::header_str(req.headers(), "user-agent").map(ToString::to_string);
    entry
}
