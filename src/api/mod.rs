// API module entry
// JSON endpoints under /api

mod contact;
mod geography;
mod response;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use std::error::Error as StdError;

use crate::config::AppState;
use crate::logger;

// Re-export public types
pub use response::*;

pub const CONTACT_PATH: &str = "/api/contact";
pub const MARKERS_PATH: &str = "/api/geography/markers";
pub const PUBLIC_REGIONS_PATH: &str = "/api/public/geography/regions";

/// API route handler
///
/// Dispatches to handler functions based on request path and method
pub async fn handle_api<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (&method, path.as_str()) {
        (&Method::POST, CONTACT_PATH) => contact::handle_contact(req, state).await,
        (&Method::GET, MARKERS_PATH) => geography::handle_markers(state).await,
        (&Method::HEAD, MARKERS_PATH) => strip_body(geography::handle_markers(state).await),
        (&Method::GET, PUBLIC_REGIONS_PATH) => {
            geography::handle_public_regions(req.headers(), state).await
        }
        (_, CONTACT_PATH) => method_not_allowed("POST, OPTIONS"),
        (_, MARKERS_PATH) => method_not_allowed("GET, HEAD, OPTIONS"),
        (_, PUBLIC_REGIONS_PATH) => method_not_allowed("GET, OPTIONS"),
        // Unknown route
        _ => {
            logger::log_debug(&format!("No API route for {method} {path}"));
            not_found()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::contact::{ContactService, Mailer, RateLimiter};
    use crate::geography::{RegionCount, RegionResolver, RegionStore};
    use crate::testing::{RecordingMailer, StaticStore};
    use http_body_util::BodyExt;
    use hyper::StatusCode;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    const VALID: &str = r#"{"name":"A","email":"a@b.co","message":"hi"}"#;

    fn state_with(
        mailer: &Arc<RecordingMailer>,
        store: Option<StaticStore>,
        token: Option<&str>,
    ) -> AppState {
        let mailer: Arc<dyn Mailer> = mailer.clone();
        let contact = ContactService::new(
            RateLimiter::in_memory(Duration::from_secs(600), 5),
            Ok(mailer),
        );
        let store = store.map(|s| Arc::new(s) as Arc<dyn RegionStore>);
        AppState::from_parts(
            Config::from_defaults().unwrap(),
            contact,
            RegionResolver::new(None, store),
            token.map(ToString::to_string),
        )
    }

    fn request(method: &str, uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.7")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn json_body(resp: Response<Full<Bytes>>) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_markers_fallback_when_nothing_configured() {
        let state = state_with(&Arc::default(), None, None);
        let resp = handle_api(request("GET", MARKERS_PATH, ""), &state).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["cache-control"], "no-store");
        assert_eq!(
            json_body(resp).await,
            json!({
                "regions": [{"regionCode": "38", "label": "Иркутская область", "count": 1}],
                "source": "fallback"
            })
        );
    }

    #[tokio::test]
    async fn test_markers_head_has_no_body() {
        let state = state_with(&Arc::default(), None, None);
        let resp = handle_api(request("HEAD", MARKERS_PATH, ""), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_contact_relays_one_mail() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with(&mailer, None, None);

        let resp = handle_api(request("POST", CONTACT_PATH, VALID), &state).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, json!({"ok": true}));
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_to, "a@b.co");
    }

    #[tokio::test]
    async fn test_contact_invalid_email() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with(&mailer, None, None);

        for email in ["foo@bar", "foo.com", ""] {
            let body = json!({"name": "A", "email": email, "message": "hi"}).to_string();
            let resp = handle_api(request("POST", CONTACT_PATH, &body), &state).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(resp).await,
                json!({"error": "Введите корректный email"})
            );
        }
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_contact_sixth_request_is_limited() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with(&mailer, None, None);

        for _ in 0..5 {
            let resp = handle_api(request("POST", CONTACT_PATH, VALID), &state).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = handle_api(request("POST", CONTACT_PATH, VALID), &state).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(mailer.sent().len(), 5);
    }

    #[tokio::test]
    async fn test_contact_body_over_limit() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with(&mailer, None, None);
        let huge = "x".repeat(70_000);

        let resp = handle_api(request("POST", CONTACT_PATH, &huge), &state).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_contact_wrong_method() {
        let state = state_with(&Arc::default(), None, None);
        let resp = handle_api(request("GET", CONTACT_PATH, ""), &state).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["allow"], "POST, OPTIONS");
    }

    #[tokio::test]
    async fn test_public_regions_requires_token() {
        let store = StaticStore::rows(vec![RegionCount::new("38", 4)]);
        let state = state_with(&Arc::default(), Some(store.clone()), Some("secret"));

        let resp = handle_api(request("GET", PUBLIC_REGIONS_PATH, ""), &state).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await, json!({"error": "Unauthorized"}));

        let mut req = request("GET", PUBLIC_REGIONS_PATH, "");
        req.headers_mut()
            .insert("authorization", "Bearer wrong".parse().unwrap());
        let resp = handle_api(req, &state).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_public_regions_without_configured_token() {
        let state = state_with(&Arc::default(), Some(StaticStore::rows(vec![])), None);
        let mut req = request("GET", PUBLIC_REGIONS_PATH, "");
        req.headers_mut()
            .insert("authorization", "Bearer anything".parse().unwrap());
        assert_eq!(handle_api(req, &state).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_public_regions_raw_rows() {
        let store = StaticStore::rows(vec![RegionCount::new("38", 4), RegionCount::new("05", 2)]);
        let state = state_with(&Arc::default(), Some(store), Some("secret"));

        let mut req = request("GET", PUBLIC_REGIONS_PATH, "");
        req.headers_mut()
            .insert("authorization", "Bearer secret".parse().unwrap());
        let resp = handle_api(req, &state).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["cache-control"], "no-store");
        assert_eq!(
            json_body(resp).await,
            json!({"regions": [
                {"regionCode": "38", "count": 4},
                {"regionCode": "05", "count": 2}
            ]})
        );
    }

    #[tokio::test]
    async fn test_public_regions_store_failure() {
        let state = state_with(&Arc::default(), Some(StaticStore::failing()), Some("secret"));
        let mut req = request("GET", PUBLIC_REGIONS_PATH, "");
        req.headers_mut()
            .insert("authorization", "Bearer secret".parse().unwrap());
        let resp = handle_api(req, &state).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await, json!({"error": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn test_unknown_api_path() {
        let state = state_with(&Arc::default(), None, None);
        let resp = handle_api(request("GET", "/api/nope", ""), &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
