//! HTTP transport seam.
//!
//! The client only needs "POST this JSON, give me status and body". Keeping
//! that behind a trait lets tests script replies without a network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::AttemptError;
use crate::types::HttpReply;

/// Synchronous-looking request/response exchange with the generation endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url` with a bearer token, bounded by `timeout`.
    ///
    /// Non-2xx statuses are returned as an [`HttpReply`], not as errors.
    ///
    /// # Errors
    ///
    /// Returns [`AttemptError::Timeout`] when `timeout` elapses, and
    /// [`AttemptError::Transport`] for connection-level failures.
    async fn post_json(
        &self,
        url: &str,
        bearer: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpReply, AttemptError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Create a transport with a fresh connection pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    /// Reuse an existing client.
    #[must_use]
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        bearer: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<HttpReply, AttemptError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        let resp = self
            .http
            .post(url)
            .bearer_auth(bearer)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest(e, timeout_ms))?;

        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        let text = resp.text().await.map_err(|e| map_reqwest(e, timeout_ms))?;
        debug!(status, bytes = text.len(), "Generation endpoint replied");

        Ok(HttpReply {
            status,
            body: text,
            retry_after,
        })
    }
}

fn map_reqwest(err: reqwest::Error, timeout_ms: u64) -> AttemptError {
    if err.is_timeout() {
        AttemptError::Timeout(timeout_ms)
    } else {
        AttemptError::from(err)
    }
}

/// Parse a `Retry-After` value given in seconds. HTTP-date values are ignored.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
