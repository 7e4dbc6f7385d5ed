//! Batch module for fetching many URLs concurrently
//!
//! This module contains:
//! - The orchestrator that validates, dispatches and aggregates a batch
//! - Report types describing each URL's outcome
//! - Progress events and statistics for display

mod orchestrator;
mod progress;
mod report;

pub use crate::fetch::FetchedPage;
pub use orchestrator::ScrapeOrchestrator;
pub use progress::{ProgressEvent, ProgressStats, ProgressTracker, UrlStatus};
pub use report::{BatchReport, FailedUrl, FailureKind, FetchOutcome};

use std::time::Duration;

/// Default number of concurrent workers
pub const DEFAULT_MAX_WORKERS: usize = 3;

/// Default per-URL deadline, covering all attempts and backoff
pub const DEFAULT_TASK_DEADLINE: Duration = Duration::from_secs(60);

/// Concurrency settings for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Number of URLs fetched at once (at least 1)
    pub max_workers: usize,
    /// Upper bound on the total time spent on one URL
    pub task_deadline: Duration,
}

impl BatchOptions {
    pub fn new(max_workers: usize, task_deadline: Duration) -> Self {
        Self {
            max_workers,
            task_deadline,
        }
    }

    /// Clamps `max_workers` to at least one
    pub fn normalized(self) -> Self {
        Self {
            max_workers: self.max_workers.max(1),
            ..self
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS, DEFAULT_TASK_DEADLINE)
    }
}

impl From<&crate::config::BatchConfig> for BatchOptions {
    fn from(config: &crate::config::BatchConfig) -> Self {
        Self::new(config.max_workers, config.task_timeout())
    }
}
