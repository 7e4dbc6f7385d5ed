//! Concurrent batch orchestration
//!
//! `fetch_batch` drives two kinds of work at once:
//! - Validation: every URL is checked in its own task, with up to
//!   [`MAX_CONCURRENT_LOOKUPS`] lookups in flight. A rejected URL goes
//!   straight to the report; an accepted one is dispatched immediately.
//! - Fetching: each dispatched URL is a task that waits for one of
//!   `max_workers` permits, then fetches under the per-task deadline.
//!
//! A slow lookup holds up only its own URL. Results are folded into the
//! report by the coordinating loop alone, in completion order.

use crate::batch::progress::{ProgressEvent, ProgressSink};
use crate::batch::{BatchOptions, BatchReport, FailedUrl, FailureKind, FetchOutcome};
use crate::fetch::ResilientFetcher;
use crate::url::{sanitize_for_log, Verdict};
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Upper bound on concurrent URL validations, independent of worker count
pub const MAX_CONCURRENT_LOOKUPS: usize = 16;

/// Fans a batch of URLs out over a bounded set of workers
#[derive(Clone)]
pub struct ScrapeOrchestrator {
    fetcher: Arc<ResilientFetcher>,
    attempt_timeout: Duration,
}

/// A dispatched URL whose outcome has not been folded yet
struct Pending {
    url: String,
    attempts: Arc<AtomicU32>,
}

impl ScrapeOrchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Shared fetcher used by every worker
    /// * `attempt_timeout` - Wall-clock budget for each single attempt
    pub fn new(fetcher: Arc<ResilientFetcher>, attempt_timeout: Duration) -> Self {
        Self {
            fetcher,
            attempt_timeout,
        }
    }

    pub fn fetcher(&self) -> &Arc<ResilientFetcher> {
        &self.fetcher
    }

    /// Fetches every URL in `urls` and reports the outcome of each
    ///
    /// Never fails: per-URL problems are recorded in the report. Returns once
    /// every URL has been recorded exactly once.
    pub async fn fetch_batch<I, S>(
        &self,
        urls: I,
        options: BatchOptions,
        cancel: &CancellationToken,
        progress: Option<UnboundedSender<ProgressEvent>>,
    ) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        let options = options.normalized();
        let progress = ProgressSink::new(progress);
        let mut report = BatchReport::new(urls.len());

        tracing::info!(
            "Starting batch of {} URLs with {} workers",
            urls.len(),
            options.max_workers
        );

        let validator = self.fetcher.validator().clone();
        let mut verdicts = stream::iter(urls.into_iter().enumerate())
            .map(|(index, url)| {
                let validator = validator.clone();
                async move {
                    let target = url.clone();
                    // Own task so a lookup never runs on this loop and a
                    // panicking resolver is contained
                    let verdict =
                        tokio::spawn(async move { validator.check(&target).await }).await;
                    (index, url, verdict)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_LOOKUPS.max(options.max_workers));

        let permits = Arc::new(Semaphore::new(options.max_workers));
        let mut tasks: JoinSet<(usize, FetchOutcome)> = JoinSet::new();
        let mut pending: HashMap<usize, Pending> = HashMap::new();
        let mut validating = true;
        let mut rejected = 0;

        loop {
            tokio::select! {
                next = verdicts.next(), if validating => {
                    let Some((index, url, verdict)) = next else {
                        validating = false;
                        continue;
                    };

                    match verdict {
                        Ok(Verdict::Allowed { .. }) => {
                            progress.emit(ProgressEvent::Queued {
                                url: sanitize_for_log(&url).into_owned(),
                            });

                            let attempts = Arc::new(AtomicU32::new(0));
                            let worker = Worker {
                                fetcher: Arc::clone(&self.fetcher),
                                attempt_timeout: self.attempt_timeout,
                                task_deadline: options.task_deadline,
                                cancel: cancel.clone(),
                                progress: progress.clone(),
                                attempts: Arc::clone(&attempts),
                            };
                            let permits = Arc::clone(&permits);
                            let target = url.clone();

                            tasks.spawn(async move {
                                // Held until the task returns
                                let _permit = permits.acquire_owned().await;
                                (index, worker.run(target).await)
                            });
                            pending.insert(index, Pending { url, attempts });
                        }
                        Ok(Verdict::Rejected(rejection)) => {
                            rejected += 1;
                            tracing::debug!(
                                url = %sanitize_for_log(&url),
                                reason = %rejection,
                                "URL rejected"
                            );
                            progress.emit(ProgressEvent::Rejected {
                                url: sanitize_for_log(&url).into_owned(),
                                reason: rejection.to_string(),
                            });
                            report.record(FetchOutcome::Failure(FailedUrl::new(
                                url,
                                FailureKind::Rejected(rejection),
                                0,
                            )));
                        }
                        Err(e) => {
                            tracing::error!(url = %sanitize_for_log(&url), "Validation task crashed: {}", e);
                            report.record(crashed(&progress, url, 0));
                        }
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    match joined {
                        Ok((index, outcome)) => {
                            pending.remove(&index);
                            report.record(outcome);
                        }
                        // Recorded from `pending` once the set drains
                        Err(e) => tracing::error!("Worker task crashed: {}", e),
                    }
                }
                else => break,
            }
        }

        for (_, lost) in pending {
            let attempts = lost.attempts.load(Ordering::SeqCst);
            report.record(crashed(&progress, lost.url, attempts));
        }

        if rejected > 0 {
            tracing::warn!("{} of {} URLs failed validation", rejected, report.total);
        }

        report.finish();
        tracing::info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );

        report
    }
}

fn crashed(progress: &ProgressSink, url: String, attempts: u32) -> FetchOutcome {
    progress.emit(ProgressEvent::Failed {
        url: sanitize_for_log(&url).into_owned(),
        reason: FailureKind::Crashed.to_string(),
    });
    FetchOutcome::Failure(FailedUrl::new(url, FailureKind::Crashed, attempts))
}

/// Everything one task needs to fetch one URL
struct Worker {
    fetcher: Arc<ResilientFetcher>,
    attempt_timeout: Duration,
    task_deadline: Duration,
    cancel: CancellationToken,
    progress: ProgressSink,
    attempts: Arc<AtomicU32>,
}

impl Worker {
    async fn run(self, url: String) -> FetchOutcome {
        let log_url = sanitize_for_log(&url).into_owned();

        if self.cancel.is_cancelled() {
            tracing::debug!(url = %log_url, "Skipping URL, batch cancelled");
            return self.fail(url, log_url, FailureKind::Cancelled, 0);
        }

        self.progress.emit(ProgressEvent::Started {
            url: log_url.clone(),
        });

        // Dropping the fetch on the deadline cancels its in-flight request
        let fetch = self.fetcher.fetch_page_tracked(
            &url,
            self.attempt_timeout,
            &self.cancel,
            &self.attempts,
        );

        let result = tokio::time::timeout(self.task_deadline, fetch).await;
        match result {
            Ok(Ok(page)) => {
                self.progress.emit(ProgressEvent::Completed {
                    url: log_url,
                    size: page.size,
                });
                FetchOutcome::Success(page)
            }
            Ok(Err(error)) => {
                let attempts = error.attempts();
                self.fail(url, log_url, FailureKind::from(error), attempts)
            }
            Err(_) => {
                tracing::warn!(
                    url = %log_url,
                    "Task deadline of {:?} exceeded",
                    self.task_deadline
                );
                let attempts = self.attempts.load(Ordering::SeqCst);
                self.fail(url, log_url, FailureKind::Timeout, attempts)
            }
        }
    }

    fn fail(&self, url: String, log_url: String, kind: FailureKind, attempts: u32) -> FetchOutcome {
        self.progress.emit(ProgressEvent::Failed {
            url: log_url,
            reason: kind.to_string(),
        });
        FetchOutcome::Failure(FailedUrl::new(url, kind, attempts))
    }
}
