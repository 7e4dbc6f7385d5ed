//! Batch outcomes and the aggregate report

use crate::fetch::{FetchError, FetchedPage, PermanentKind, TransientKind};
use crate::url::Rejection;
use chrono::{DateTime, Utc};
use std::fmt;

/// Why a URL ended up in [`BatchReport::failed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Failed validation; never fetched
    Rejected(Rejection),
    /// Every attempt failed transiently
    Transient(TransientKind),
    /// Non-retryable response
    Permanent(PermanentKind),
    /// The per-task deadline elapsed
    Timeout,
    /// The batch was cancelled before this URL finished
    Cancelled,
    /// The fetch task panicked
    Crashed,
}

impl FailureKind {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(rejection) => write!(f, "rejected: {}", rejection),
            Self::Transient(kind) => write!(f, "failed after retries: {}", kind),
            Self::Permanent(kind) => write!(f, "failed: {}", kind),
            Self::Timeout => f.write_str("task deadline exceeded"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Crashed => f.write_str("worker crashed"),
        }
    }
}

impl From<FetchError> for FailureKind {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Validation { rejection, .. } => Self::Rejected(rejection),
            FetchError::Exhausted { last, .. } => Self::Transient(last),
            FetchError::Permanent { kind, .. } => Self::Permanent(kind),
            FetchError::Cancelled { .. } => Self::Cancelled,
        }
    }
}

/// A URL that did not produce a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUrl {
    /// The URL as supplied by the caller
    pub url: String,
    pub kind: FailureKind,
    /// Network attempts made (0 for rejected or never-started URLs)
    pub attempts: u32,
}

impl FailedUrl {
    pub fn new(url: impl Into<String>, kind: FailureKind, attempts: u32) -> Self {
        Self {
            url: url.into(),
            kind,
            attempts,
        }
    }

    pub fn from_error(url: impl Into<String>, error: FetchError) -> Self {
        let attempts = error.attempts();
        Self::new(url, FailureKind::from(error), attempts)
    }
}

/// Result of one URL in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(FetchedPage),
    Failure(FailedUrl),
}

impl FetchOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Success(page) => &page.url,
            Self::Failure(failed) => &failed.url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Aggregate result of [`fetch_batch`](crate::batch::ScrapeOrchestrator::fetch_batch)
///
/// Every input URL appears exactly once, in either `succeeded` or `failed`.
/// Both lists are in completion order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Number of URLs submitted
    pub total: usize,
    pub succeeded: Vec<FetchedPage>,
    pub failed: Vec<FailedUrl>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchReport {
    /// Starts an empty report for `total` URLs
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: Vec::new(),
            failed: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Success(page) => self.succeeded.push(page),
            FetchOutcome::Failure(failed) => self.failed.push(failed),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// URLs that did not produce a body, in report order
    pub fn failed_urls(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.url.as_str()).collect()
    }

    /// Number of URLs recorded so far
    pub fn completed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.failed.iter().filter(|f| f.kind.is_rejection()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.completed() == self.total
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.is_complete()
    }

    /// Wall-clock duration of the batch, once finished
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
