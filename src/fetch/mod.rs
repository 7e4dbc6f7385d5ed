//! Fetch module for validated, retrying HTTP GETs
//!
//! This module contains everything between a validated URL and its body:
//! - Backoff policy between attempts
//! - Proxy URL wrapping
//! - Request header construction (User-Agent rotation)
//! - The HTTP transport seam and its reqwest implementation
//! - The resilient fetcher that ties them together
//!
//! Failures are tagged once, where they are produced, as transient or
//! permanent ([`AttemptError`]); the retry loop only ever looks at the tag.

mod backoff;
mod fetcher;
mod headers;
mod proxy;
mod transport;

pub use backoff::{backoff_delay, BackoffPolicy};
pub use fetcher::{ResilientFetcher, RetrySettings};
pub use headers::RequestHeaders;
pub use proxy::ProxyEndpoint;
pub use transport::{build_http_client, OutboundRequest, ReqwestTransport, Transport};

use crate::url::Rejection;
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Retryable failure of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransientKind {
    /// The attempt exceeded its wall-clock budget
    Timeout,
    /// The connection could not be established
    Connect,
    /// The connection failed mid-request (reset, aborted)
    Network,
    /// The response body could not be read
    Body,
    /// HTTP 429 or 5xx
    Status(u16),
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Connect => f.write_str("connection failed"),
            Self::Network => f.write_str("connection interrupted"),
            Self::Body => f.write_str("response body could not be read"),
            Self::Status(code) => write!(f, "HTTP {}", code),
        }
    }
}

/// Non-retryable failure of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermanentKind {
    /// 4xx other than 429, or any other unexpected non-success status
    Status(u16),
    /// A 3xx response; redirects are never followed
    Redirect(u16),
    /// The request could not be built
    InvalidRequest,
}

impl fmt::Display for PermanentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Redirect(code) => write!(f, "unexpected redirect (HTTP {})", code),
            Self::InvalidRequest => f.write_str("request could not be built"),
        }
    }
}

/// Tagged failure of one attempt, decided by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("transient: {0}")]
    Transient(TransientKind),

    #[error("permanent: {0}")]
    Permanent(PermanentKind),
}

/// Classifies an HTTP status
///
/// # Returns
///
/// * `None` - 2xx, the body should be read
/// * `Some(AttemptError::Transient)` - 429 or 5xx
/// * `Some(AttemptError::Permanent)` - everything else
pub fn classify_status(status: StatusCode) -> Option<AttemptError> {
    let code = status.as_u16();

    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Some(AttemptError::Transient(TransientKind::Status(code)))
    } else if status.is_redirection() {
        Some(AttemptError::Permanent(PermanentKind::Redirect(code)))
    } else {
        Some(AttemptError::Permanent(PermanentKind::Status(code)))
    }
}

/// Final failure of one fetch call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("URL rejected: {rejection}")]
    Validation { rejection: Rejection, attempts: u32 },

    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: TransientKind },

    #[error("{kind}")]
    Permanent { attempts: u32, kind: PermanentKind },

    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl FetchError {
    /// Number of network attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Validation { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Permanent { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// A successfully fetched URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// The URL as supplied by the caller
    pub url: String,
    /// Decoded response body
    pub body: String,
    /// Body size in bytes
    pub size: usize,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, body: String, attempts: u32) -> Self {
        let size = body.len();
        Self {
            url: url.into(),
            body,
            size,
            attempts,
        }
    }
}
