//! Resilient fetcher
//!
//! One call fetches one URL:
//!
//! 1. Validate the URL (fresh DNS lookup); a rejection ends the call
//! 2. Wrap it for the proxy and send one attempt under its own timeout
//! 3. On a transient failure, sleep `backoff.delay(attempt)` and go to 1
//! 4. On a permanent failure or success, return immediately
//!
//! No sleep follows the final attempt. A cancellation token is observed
//! while sleeping between attempts.

use crate::config::FetchConfig;
use crate::fetch::{
    AttemptError, BackoffPolicy, FetchError, FetchedPage, OutboundRequest, ProxyEndpoint,
    RequestHeaders, TransientKind, Transport,
};
use crate::url::{sanitize_for_log, UrlValidator};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Retry behavior of a [`ResilientFetcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
}

impl RetrySettings {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: BackoffPolicy::new(config.backoff_base(), config.backoff_cap()),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy::with_base(Duration::from_secs(5)),
        }
    }
}

/// Per-call retry bookkeeping; never shared between URLs
#[derive(Debug, Default)]
struct RetryState {
    attempt: u32,
}

/// Fetches single URLs through the proxy with validation and retry
pub struct ResilientFetcher {
    validator: UrlValidator,
    transport: Arc<dyn Transport>,
    proxy: ProxyEndpoint,
    headers: RequestHeaders,
    retry: RetrySettings,
}

impl ResilientFetcher {
    /// Creates a fetcher
    ///
    /// The transport owns the connection pool; pass the same `Arc` to every
    /// fetcher that should share it.
    pub fn new(
        validator: UrlValidator,
        transport: Arc<dyn Transport>,
        proxy: ProxyEndpoint,
        headers: RequestHeaders,
        retry: RetrySettings,
    ) -> Self {
        let retry = RetrySettings {
            max_attempts: retry.max_attempts.max(1),
            ..retry
        };

        Self {
            validator,
            transport,
            proxy,
            headers,
            retry,
        }
    }

    pub fn validator(&self) -> &UrlValidator {
        &self.validator
    }

    /// Fetches `url` and returns the decoded body
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Response body text
    /// * `Err(FetchError::Validation)` - URL failed validation; nothing was sent
    /// * `Err(FetchError::Permanent)` - Non-retryable response
    /// * `Err(FetchError::Exhausted)` - Every attempt failed transiently
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let page = self
            .fetch_page(url, timeout, &CancellationToken::new())
            .await?;
        Ok(page.body)
    }

    /// Fetches `raw` with retry, observing `cancel` between attempts
    pub async fn fetch_page(
        &self,
        raw: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, FetchError> {
        self.fetch_page_tracked(raw, timeout, cancel, &AtomicU32::new(0))
            .await
    }

    /// Like [`fetch_page`](Self::fetch_page), publishing the attempt count
    ///
    /// `attempts` is updated as each attempt starts, so a caller that drops
    /// this future on a deadline still knows how many requests were sent.
    pub async fn fetch_page_tracked(
        &self,
        raw: &str,
        timeout: Duration,
        cancel: &CancellationToken,
        attempts: &AtomicU32,
    ) -> Result<FetchedPage, FetchError> {
        let log_url = sanitize_for_log(raw);
        let mut state = RetryState::default();

        loop {
            let target = self.revalidate(raw, state.attempt).await?;
            let request = OutboundRequest {
                url: self.proxy.wrap(&target),
                target,
                headers: self.headers.build(),
                timeout,
            };

            state.attempt += 1;
            attempts.store(state.attempt, Ordering::SeqCst);
            tracing::debug!(url = %log_url, attempt = state.attempt, "Fetching URL");

            let result = tokio::time::timeout(timeout, self.transport.get(&request))
                .await
                .unwrap_or(Err(AttemptError::Transient(TransientKind::Timeout)));

            let kind = match result {
                Ok(body) => {
                    let page = FetchedPage::new(raw, body, state.attempt);
                    tracing::debug!(
                        url = %log_url,
                        size = page.size,
                        attempts = page.attempts,
                        "URL fetched successfully"
                    );
                    return Ok(page);
                }
                Err(AttemptError::Permanent(kind)) => {
                    tracing::warn!(url = %log_url, error = %kind, "Permanent fetch failure");
                    return Err(FetchError::Permanent {
                        attempts: state.attempt,
                        kind,
                    });
                }
                Err(AttemptError::Transient(kind)) => kind,
            };

            if state.attempt >= self.retry.max_attempts {
                tracing::warn!(
                    url = %log_url,
                    attempts = state.attempt,
                    error = %kind,
                    "Giving up after transient failures"
                );
                return Err(FetchError::Exhausted {
                    attempts: state.attempt,
                    last: kind,
                });
            }

            let delay = self.retry.backoff.delay(state.attempt - 1);
            tracing::warn!(
                url = %log_url,
                attempt = state.attempt,
                max_attempts = self.retry.max_attempts,
                error = %kind,
                "Transient failure, retrying in {:?}",
                delay
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(url = %log_url, "Fetch cancelled during backoff");
                    return Err(FetchError::Cancelled { attempts: state.attempt });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Validates `raw` before an attempt and returns the parsed target
    async fn revalidate(&self, raw: &str, attempts: u32) -> Result<Url, FetchError> {
        let rejected = |rejection| FetchError::Validation {
            rejection,
            attempts,
        };

        self.validator
            .check(raw)
            .await
            .into_result()
            .map_err(rejected)?;

        Url::parse(raw).map_err(|e| rejected(crate::url::Rejection::Parse(e)))
    }
}
