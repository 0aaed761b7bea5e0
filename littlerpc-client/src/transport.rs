//! Single-exchange HTTP transport.
//!
//! Both modes send the serialized call with JSON content-type and accept
//! headers and hand back the raw response bytes whatever the transport
//! status - the envelope flag is what callers consult.

use crate::error::ClientError;
use bytes::Bytes;
use littlerpc_protocol::DEFAULT_TIMEOUT_MS;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server.
    pub url: String,
    /// Async request timeout. Zero disables the timeout. Sync-mode calls
    /// never time out.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Performs one async exchange, suspending the caller until the response
/// body arrives.
pub(crate) async fn exchange(
    http: &reqwest::Client,
    url: &str,
    body: Bytes,
    timeout: Duration,
) -> Result<Bytes, ClientError> {
    let mut request = http
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .body(body);
    if !timeout.is_zero() {
        request = request.timeout(timeout);
    }

    let response = request.send().await.map_err(map_reqwest_error)?;
    response.bytes().await.map_err(map_reqwest_error)
}

/// Performs one blocking exchange. The calling thread blocks for the full
/// round trip and no timeout is applied.
pub(crate) fn exchange_sync(url: &str, body: Bytes) -> Result<Bytes, ClientError> {
    let http = reqwest::blocking::Client::builder()
        .timeout(None)
        .build()
        .map_err(map_reqwest_error)?;

    let response = http
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .body(body.to_vec())
        .send()
        .map_err(map_reqwest_error)?;

    response.bytes().map_err(map_reqwest_error)
}

fn map_reqwest_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Network(e)
    }
}
