// Contact form endpoint

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Request, Response, StatusCode};
use std::error::Error as StdError;

use super::response::{error_response, json_response, payload_too_large};
use crate::config::AppState;
use crate::contact::ContactError;
use crate::http;
use crate::logger;

/// `POST /api/contact`
pub async fn handle_contact<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let client = http::client_address(req.headers());
    let limit = usize::try_from(state.config.http.max_body_size).unwrap_or(usize::MAX);

    let body = match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Contact body from {client} exceeds {limit} bytes"));
            return payload_too_large();
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read contact body from {client}: {e}"));
            let err = ContactError::MalformedPayload;
            return error_response(StatusCode::BAD_REQUEST, err.public_message());
        }
    };

    match state.contact.submit(&client, &body).await {
        Ok(_) => json_response(StatusCode::OK, &serde_json::json!({ "ok": true })),
        Err(e) => {
            let status = StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                logger::log_error(&format!("Contact submission from {client} failed: {e}"));
            } else {
                logger::log_debug(&format!("Contact submission from {client} rejected: {e}"));
            }
            error_response(status, e.public_message())
        }
    }
}
