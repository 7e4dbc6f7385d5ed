//! Per-URL progress events and batch statistics
//!
//! The orchestrator emits [`ProgressEvent`]s on an unbounded channel when one
//! is supplied. [`ProgressTracker`] folds them into completion counts, a
//! throughput figure and an ETA for display.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

/// Status change of one URL; URLs are already sanitized for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Passed validation and waits for a worker slot
    Queued { url: String },
    /// Failed validation; will not be fetched
    Rejected { url: String, reason: String },
    /// A worker started fetching
    Started { url: String },
    /// Fetched successfully
    Completed { url: String, size: usize },
    /// Finished without a body
    Failed { url: String, reason: String },
}

impl ProgressEvent {
    pub fn url(&self) -> &str {
        match self {
            Self::Queued { url }
            | Self::Rejected { url, .. }
            | Self::Started { url }
            | Self::Completed { url, .. }
            | Self::Failed { url, .. } => url,
        }
    }

    /// Whether the URL reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected { .. } | Self::Completed { .. } | Self::Failed { .. }
        )
    }
}

/// Optional event sink shared by the orchestrator and its workers
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressSink(Option<UnboundedSender<ProgressEvent>>);

impl ProgressSink {
    pub(crate) fn new(sender: Option<UnboundedSender<ProgressEvent>>) -> Self {
        Self(sender)
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.0 {
            // A dropped receiver only means nobody is watching
            let _ = sender.send(event);
        }
    }
}

/// Display state of one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlStatus {
    Queued,
    Running,
    Completed { size: usize },
    Failed { reason: String },
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => f.write_str("queued"),
            Self::Running => f.write_str("running"),
            Self::Completed { size } => write!(f, "completed ({}B)", size),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Snapshot of batch progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressStats {
    pub total: usize,
    pub completed: usize,
    /// Whole percent, 0..=100
    pub percent: u8,
    pub urls_per_minute: f64,
    /// `None` until at least one URL has completed
    pub eta: Option<Duration>,
}

impl fmt::Display for ProgressStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {}% | Speed: {:.1} URL/min | ETA: ",
            self.percent, self.urls_per_minute
        )?;
        match self.eta {
            Some(eta) => write!(f, "{:.1} sec", eta.as_secs_f64()),
            None => f.write_str("--"),
        }
    }
}

/// Folds progress events into per-URL status and overall statistics
#[derive(Debug)]
pub struct ProgressTracker {
    urls: HashMap<String, UrlStatus>,
    completed: usize,
    started_at: Instant,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            urls: HashMap::new(),
            completed: 0,
            started_at: Instant::now(),
        }
    }

    /// Applies one event
    ///
    /// A URL is counted once no matter how many terminal events arrive for it.
    pub fn apply(&mut self, event: &ProgressEvent) {
        let url = event.url();
        let already_done = matches!(
            self.urls.get(url),
            Some(UrlStatus::Completed { .. } | UrlStatus::Failed { .. })
        );

        let status = match event {
            ProgressEvent::Queued { .. } => UrlStatus::Queued,
            ProgressEvent::Started { .. } => UrlStatus::Running,
            ProgressEvent::Completed { size, .. } => UrlStatus::Completed { size: *size },
            ProgressEvent::Rejected { reason, .. } | ProgressEvent::Failed { reason, .. } => {
                UrlStatus::Failed {
                    reason: reason.clone(),
                }
            }
        };

        if already_done {
            return;
        }
        if event.is_terminal() {
            self.completed += 1;
        }
        self.urls.insert(url.to_string(), status);
    }

    pub fn status(&self, url: &str) -> Option<&UrlStatus> {
        self.urls.get(url)
    }

    pub fn total(&self) -> usize {
        self.urls.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Statistics as of now
    pub fn stats(&self) -> ProgressStats {
        self.stats_after(self.started_at.elapsed())
    }

    /// Statistics after `elapsed` time; elapsed is floored at one second
    pub fn stats_after(&self, elapsed: Duration) -> ProgressStats {
        let total = self.total();
        let percent = if total == 0 {
            0
        } else {
            (self.completed * 100 / total) as u8
        };

        let minutes = elapsed.max(Duration::from_secs(1)).as_secs_f64() / 60.0;
        let urls_per_minute = self.completed as f64 / minutes;

        let eta = if urls_per_minute > 0.0 {
            let remaining = total.saturating_sub(self.completed) as f64;
            Some(Duration::from_secs_f64(remaining / urls_per_minute * 60.0))
        } else {
            None
        };

        ProgressStats {
            total,
            completed: self.completed,
            percent,
            urls_per_minute,
            eta,
        }
    }
}
