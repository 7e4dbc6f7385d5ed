//! Batch orchestration: isolation between workers, containment and
//! cancellation

use crate::support::{client_with, retry, Behavior, HostTransport};
use scrape_guard::batch::BatchOptions;
use scrape_guard::fetch::{AttemptError, PermanentKind};
use scrape_guard::FailureKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_public_and_localhost_with_one_worker() {
    let transport = Arc::new(HostTransport::new());
    let client = client_with(
        transport.clone(),
        retry(3, Duration::from_secs(1)),
        Duration::from_secs(10),
    );

    let report = client
        .fetch_batch(
            ["http://example.com", "http://localhost"],
            1,
            Duration::from_secs(60),
        )
        .await;

    assert_eq!(report.total, 2);
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.succeeded[0].url, "http://example.com");
    assert_eq!(report.failed_urls(), vec!["http://localhost"]);
    assert!(report.failed[0].kind.is_rejection());
    assert_eq!(transport.calls_for("localhost"), 0);
    assert_eq!(transport.calls(), vec!["http://example.com/".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_worker_does_not_delay_siblings() {
    let transport = Arc::new(
        HostTransport::new()
            .route("hang.example", Behavior::Hang)
            .route(
                "fast.example",
                Behavior::Respond(Duration::from_millis(100), "fast".to_string()),
            )
            .route(
                "slow.example",
                Behavior::Respond(Duration::from_millis(300), "slow".to_string()),
            ),
    );
    // Attempt timeout longer than the task deadline so the deadline is what fires
    let client = client_with(
        transport.clone(),
        retry(1, Duration::from_secs(1)),
        Duration::from_secs(120),
    );
    let deadline = Duration::from_secs(5);

    let start = Instant::now();
    let report = client
        .fetch_batch(
            [
                "http://hang.example/",
                "http://fast.example/",
                "http://slow.example/",
            ],
            3,
            deadline,
        )
        .await;

    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].url, "http://hang.example/");
    assert_eq!(report.failed[0].kind, FailureKind::Timeout);

    for (url, finished) in transport.finished_at() {
        assert!(
            finished - start < Duration::from_secs(1),
            "{} finished late",
            url
        );
    }
    // Completion order: fast, then slow
    let order: Vec<&str> = report.succeeded.iter().map(|p| p.body.as_str()).collect();
    assert_eq!(order, vec!["fast", "slow"]);
    assert_eq!(start.elapsed(), deadline);
}

#[tokio::test]
async fn test_panicking_worker_is_contained() {
    let transport = Arc::new(HostTransport::new().route("panic.example", Behavior::Panic));
    let client = client_with(
        transport.clone(),
        retry(1, Duration::from_millis(10)),
        Duration::from_secs(5),
    );

    let report = client
        .fetch_batch(
            ["http://panic.example/", "http://a.example/", "http://b.example/"],
            2,
            Duration::from_secs(10),
        )
        .await;

    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].url, "http://panic.example/");
    assert_eq!(report.failed[0].kind, FailureKind::Crashed);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_new_work() {
    let transport = Arc::new(
        HostTransport::new()
            .route(
                "a.example",
                Behavior::Respond(Duration::from_secs(1), "a".to_string()),
            )
            .route(
                "b.example",
                Behavior::Respond(Duration::from_secs(1), "b".to_string()),
            )
            .route(
                "c.example",
                Behavior::Respond(Duration::from_secs(1), "c".to_string()),
            ),
    );
    let client = client_with(
        transport.clone(),
        retry(3, Duration::from_secs(1)),
        Duration::from_secs(10),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let report = client
        .fetch_batch_with(
            vec![
                "http://a.example/".to_string(),
                "http://b.example/".to_string(),
                "http://c.example/".to_string(),
            ],
            BatchOptions::new(1, Duration::from_secs(60)),
            &cancel,
            None,
        )
        .await;

    // The in-flight fetch finishes its attempt; the queued ones never start
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.failed.len(), 2);
    assert!(report
        .failed
        .iter()
        .all(|f| f.kind == FailureKind::Cancelled && f.attempts == 0));
}

#[tokio::test]
async fn test_per_url_failures_are_aggregated() {
    let transport = Arc::new(HostTransport::new().route(
        "example.org",
        Behavior::Fail(AttemptError::Permanent(PermanentKind::Status(404))),
    ));
    let client = client_with(
        transport.clone(),
        retry(3, Duration::from_millis(10)),
        Duration::from_secs(5),
    );

    let report = client
        .fetch_batch(
            [
                "http://example.org/missing",
                "http://mixed.example/",
                "javascript:alert(1)",
                "http://example.com/",
            ],
            3,
            Duration::from_secs(10),
        )
        .await;

    assert_eq!(report.total, 4);
    assert!(report.is_complete());
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.rejected_count(), 2);

    let missing = report
        .failed
        .iter()
        .find(|f| f.url == "http://example.org/missing")
        .unwrap();
    assert_eq!(missing.kind, FailureKind::Permanent(PermanentKind::Status(404)));
    assert_eq!(missing.attempts, 1);
    assert_eq!(transport.calls_for("example.org"), 1);
}
