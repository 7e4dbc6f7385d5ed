//! Scrape-Guard: SSRF-safe, resilient concurrent fetching
//!
//! This crate fetches caller-supplied URLs without letting them reach internal
//! networks. Every URL is validated (scheme, port, DNS resolution, address
//! ranges) before and during fetching, transient failures are retried with
//! exponential backoff, and batches are fanned out across a bounded worker pool.

pub mod batch;
pub mod client;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod url;

use thiserror::Error;

/// Main error type for setup-level failures
///
/// Per-URL problems never surface here; they are folded into a
/// [`batch::BatchReport`] or returned as a [`fetch::FetchError`].
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing proxy API key (expected in {0})")]
    MissingApiKey(String),
}

/// Result type alias for Scrape-Guard operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use batch::{BatchOptions, BatchReport, FailedUrl, FailureKind, FetchOutcome, FetchedPage};
pub use client::ScrapeClient;
pub use config::Config;
pub use fetch::{BackoffPolicy, FetchError, ResilientFetcher};
pub use crate::url::{sanitize_for_log, Rejection, UrlValidator, Verdict};
