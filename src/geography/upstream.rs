//! Upstream HTTP source of region statistics

use futures::future::BoxFuture;
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::SourceError;

/// Anything that can produce a raw region payload
pub trait UpstreamSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<Value, SourceError>>;
}

/// `GET` against a configured URL with an optional bearer token
pub struct HttpUpstream {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpUpstream {
    pub fn new(url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            token: token.map(ToString::to_string),
        })
    }
}

impl UpstreamSource for HttpUpstream {
    fn fetch(&self) -> BoxFuture<'_, Result<Value, SourceError>> {
        Box::pin(async move {
            let mut request = self.client.get(&self.url).header(CACHE_CONTROL, "no-store");
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status(status.as_u16()));
            }

            Ok(response.json::<Value>().await?)
        })
    }
}
