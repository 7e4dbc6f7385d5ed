//! Composition root
//!
//! [`ScrapeClient`] wires the resolver, validator, shared HTTP client, proxy
//! endpoint, fetcher and orchestrator together from a [`Config`].

use crate::batch::{BatchOptions, BatchReport, ProgressEvent, ScrapeOrchestrator};
use crate::config::Config;
use crate::fetch::{
    build_http_client, FetchError, ProxyEndpoint, ReqwestTransport, RequestHeaders,
    ResilientFetcher, RetrySettings, Transport,
};
use crate::url::{UrlValidator, Verdict};
use crate::ScrapeError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Entry point for validating and fetching URLs
#[derive(Clone)]
pub struct ScrapeClient {
    validator: UrlValidator,
    fetcher: Arc<ResilientFetcher>,
    orchestrator: ScrapeOrchestrator,
    timeout: Duration,
    batch: BatchOptions,
}

impl ScrapeClient {
    /// Builds a client from configuration
    ///
    /// Creates the single HTTP connection pool shared by every fetch.
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapeClient)` - Ready to fetch
    /// * `Err(ScrapeError::Config)` - The proxy API key is missing or a setting is invalid
    /// * `Err(ScrapeError::Client)` - The HTTP client could not be built
    pub fn from_config(config: &Config) -> Result<Self, ScrapeError> {
        let proxy = ProxyEndpoint::from_config(&config.proxy)?;
        let headers = RequestHeaders::from_config(&config.http)?;
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(build_http_client()?));
        let validator = UrlValidator::system(config.fetch.resolver_timeout());

        tracing::info!("Routing requests through {}", proxy.endpoint());

        Ok(Self::with_parts(
            validator,
            transport,
            proxy,
            headers,
            RetrySettings::from_config(&config.fetch),
            config.fetch.timeout(),
            BatchOptions::from(&config.batch),
        ))
    }

    /// Builds a client from explicit parts
    pub fn with_parts(
        validator: UrlValidator,
        transport: Arc<dyn Transport>,
        proxy: ProxyEndpoint,
        headers: RequestHeaders,
        retry: RetrySettings,
        timeout: Duration,
        batch: BatchOptions,
    ) -> Self {
        let fetcher = Arc::new(ResilientFetcher::new(
            validator.clone(),
            transport,
            proxy,
            headers,
            retry,
        ));
        let orchestrator = ScrapeOrchestrator::new(Arc::clone(&fetcher), timeout);

        Self {
            validator,
            fetcher,
            orchestrator,
            timeout,
            batch,
        }
    }

    /// Returns whether `url` is safe to fetch
    pub async fn validate(&self, url: &str) -> bool {
        self.validator.validate(url).await
    }

    /// Validates `url` and returns the reason on rejection
    pub async fn check(&self, url: &str) -> Verdict {
        self.validator.check(url).await
    }

    /// Fetches one URL with retry, using the configured per-attempt timeout
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetcher.fetch(url, self.timeout).await
    }

    /// Fetches one URL with an explicit per-attempt timeout
    pub async fn fetch_with_timeout(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.fetcher.fetch(url, timeout).await
    }

    /// Fetches a batch with explicit worker count and per-task deadline
    pub async fn fetch_batch<I, S>(
        &self,
        urls: I,
        max_workers: usize,
        task_deadline: Duration,
    ) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orchestrator
            .fetch_batch(
                urls,
                BatchOptions::new(max_workers, task_deadline),
                &CancellationToken::new(),
                None,
            )
            .await
    }

    /// Fetches a batch with cancellation and optional progress events
    pub async fn fetch_batch_with(
        &self,
        urls: Vec<String>,
        options: BatchOptions,
        cancel: &CancellationToken,
        progress: Option<UnboundedSender<ProgressEvent>>,
    ) -> BatchReport {
        self.orchestrator
            .fetch_batch(urls, options, cancel, progress)
            .await
    }

    /// Batch settings taken from configuration
    pub fn batch_options(&self) -> BatchOptions {
        self.batch
    }
}
