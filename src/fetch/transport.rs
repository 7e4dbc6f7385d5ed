//! HTTP transport
//!
//! This module handles the single network attempt behind every fetch:
//! - Building the shared HTTP client (connection pool) once per process
//! - Sending one GET with a per-attempt timeout
//! - Classifying every failure as transient or permanent
//!
//! The [`Transport`] trait is the seam the fetcher is written against, so the
//! retry loop can be exercised without a network.

use crate::fetch::{classify_status, AttemptError, PermanentKind, TransientKind};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// One outbound GET
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// The validated target URL (what the caller asked for)
    pub target: Url,
    /// The URL actually requested (the proxy-wrapped target)
    pub url: Url,
    /// Headers for this attempt
    pub headers: HeaderMap,
    /// Wall-clock budget for this attempt
    pub timeout: Duration,
}

/// Performs one HTTP attempt
///
/// Implementations return the decoded body on 2xx and a tagged
/// [`AttemptError`] otherwise. They must not retry on their own.
///
/// This trait uses `async_trait` so the fetcher can hold `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &OutboundRequest) -> Result<String, AttemptError>;
}

/// Builds the process-wide HTTP client
///
/// Redirects are never followed: a redirect could point at an address that
/// was never validated. Timeouts are applied per request.
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] backed by a shared `reqwest::Client`
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &OutboundRequest) -> Result<String, AttemptError> {
        let response = self
            .client
            .get(request.url.clone())
            .headers(request.headers.clone())
            .timeout(request.timeout)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        if let Some(error) = classify_status(response.status()) {
            return Err(error);
        }

        response.text().await.map_err(classify_reqwest_error)
    }
}

/// Maps a reqwest error onto the attempt taxonomy
///
/// | Condition | Kind |
/// |-----------|------|
/// | Timeout | Transient |
/// | Connection refused / DNS / TLS handshake | Transient |
/// | Body or decode failure | Transient |
/// | Request could not be built | Permanent |
/// | Anything else (reset, aborted) | Transient |
fn classify_reqwest_error(error: reqwest::Error) -> AttemptError {
    let kind = if error.is_timeout() {
        AttemptError::Transient(TransientKind::Timeout)
    } else if error.is_connect() {
        AttemptError::Transient(TransientKind::Connect)
    } else if error.is_builder() {
        AttemptError::Permanent(PermanentKind::InvalidRequest)
    } else if error.is_body() || error.is_decode() {
        AttemptError::Transient(TransientKind::Body)
    } else {
        AttemptError::Transient(TransientKind::Network)
    };

    // The request URL carries the proxy API key
    tracing::debug!("HTTP attempt failed ({}): {}", kind, error.without_url());
    kind
}
