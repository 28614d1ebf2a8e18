//! HTTP capability for the ceremony transport
//!
//! The ceremony endpoints are plain JSON-over-POST. The client behind them is
//! injected so orchestrators stay deterministic under test; the default
//! implementation wraps `reqwest`. No retries anywhere — a failed call
//! surfaces immediately to the caller.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use url::Url;

use crate::errors::{is_valid_status, CeremonyError};

/// Status and parsed JSON body of a ceremony endpoint response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Value,
}

/// Injected HTTP capability
///
/// One suspend point: a JSON POST (body optional) returning the status and
/// parsed body. Status policy is applied by the ceremony fetch functions.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST `body` as JSON to `url` and parse the JSON response
    ///
    /// # Errors
    ///
    /// Returns [`CeremonyError::Network`] if the request itself fails, or
    /// [`CeremonyError::InvalidResponse`] if a success response carries a
    /// body that is not JSON
    async fn post_json(&self, url: &str, body: Option<&Value>) -> Result<HttpResponse, CeremonyError>;
}

/// Build a ceremony endpoint URL under the given origin
///
/// # Errors
///
/// Returns [`CeremonyError::InvalidInput`] if the origin is not an absolute URL
pub fn endpoint(origin: &str, path: &str) -> Result<String, CeremonyError> {
    Url::parse(origin).map_err(|_| CeremonyError::InvalidInput)?;
    Ok(format!("{}/{}", origin.trim_end_matches('/'), path))
}

/// Default [`HttpClient`] backed by `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(&self, url: &str, body: Option<&Value>) -> Result<HttpResponse, CeremonyError> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CeremonyError::Network(e.to_string()))?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("unknown").to_string();
        let text = response
            .text()
            .await
            .map_err(|e| CeremonyError::Network(e.to_string()))?;

        let body = match serde_json::from_str(&text) {
            Ok(value) => value,
            // A success response must be JSON; error bodies are reported by
            // status alone.
            Err(_) if is_valid_status(status.as_u16()) => {
                return Err(CeremonyError::InvalidResponse)
            }
            Err(_) => Value::Null,
        };

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}
