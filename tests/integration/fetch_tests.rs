//! End-to-end fetches through a mock proxy
//!
//! These tests use wiremock as the fetch proxy. Targets resolve through the
//! fixed test resolver, so only the proxy itself is contacted.

use crate::support::{retry, test_validator, API_KEY};
use reqwest::header::{HeaderMap, HeaderValue};
use scrape_guard::batch::BatchOptions;
use scrape_guard::fetch::{
    build_http_client, PermanentKind, ProxyEndpoint, ReqwestTransport, RequestHeaders,
    RetrySettings, TransientKind,
};
use scrape_guard::url::Rejection;
use scrape_guard::{FetchError, ScrapeClient};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn proxied_client(server: &MockServer, headers: RequestHeaders, retry: RetrySettings) -> ScrapeClient {
    ScrapeClient::with_parts(
        test_validator(),
        Arc::new(ReqwestTransport::new(build_http_client().unwrap())),
        ProxyEndpoint::new(&server.uri(), API_KEY).unwrap(),
        headers,
        retry,
        Duration::from_secs(5),
        BatchOptions::default(),
    )
}

fn default_headers() -> RequestHeaders {
    RequestHeaders::new(["TestAgent/1.0"], HeaderMap::new()).unwrap()
}

async fn received(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_fetch_goes_through_proxy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("api_key", API_KEY))
        .and(query_param("url", "http://example.com/page?q=1&r=2"))
        .and(header("dnt", "1"))
        .and(header("user-agent", "TestAgent/1.0"))
        .and(header_exists("accept"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = proxied_client(&server, default_headers(), retry(3, Duration::from_millis(10)));
    let body = client.fetch("http://example.com/page?q=1&r=2").await.unwrap();

    assert_eq!(body, "<html>hello</html>");
}

#[tokio::test]
async fn test_configured_headers_override_defaults() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", "Pinned/2.0"))
        .and(header("x-trace", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let mut extra = HeaderMap::new();
    extra.insert("User-Agent", HeaderValue::from_static("Pinned/2.0"));
    extra.insert("X-Trace", HeaderValue::from_static("abc"));
    let headers = RequestHeaders::new(["TestAgent/1.0"], extra).unwrap();

    let client = proxied_client(&server, headers, retry(1, Duration::from_millis(10)));
    assert_eq!(client.fetch("https://example.com/").await.unwrap(), "ok");
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("third time"))
        .mount(&server)
        .await;

    let client = proxied_client(&server, default_headers(), retry(3, Duration::from_millis(20)));
    let body = client.fetch("http://example.com/").await.unwrap();

    assert_eq!(body, "third time");
    assert_eq!(received(&server).await, 3);
}

#[tokio::test]
async fn test_rate_limit_exhausts_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = proxied_client(&server, default_headers(), retry(2, Duration::from_millis(10)));
    let result = client.fetch("http://example.com/").await;

    assert_eq!(
        result,
        Err(FetchError::Exhausted {
            attempts: 2,
            last: TransientKind::Status(429)
        })
    );
    assert_eq!(received(&server).await, 2);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = proxied_client(&server, default_headers(), retry(5, Duration::from_millis(10)));
    let result = client.fetch("http://example.com/missing").await;

    assert_eq!(
        result,
        Err(FetchError::Permanent {
            attempts: 1,
            kind: PermanentKind::Status(404)
        })
    );
}

#[tokio::test]
async fn test_redirects_are_not_followed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "http://169.254.169.254/latest"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = proxied_client(&server, default_headers(), retry(3, Duration::from_millis(10)));
    let result = client.fetch("http://example.com/").await;

    assert_eq!(
        result,
        Err(FetchError::Permanent {
            attempts: 1,
            kind: PermanentKind::Redirect(302)
        })
    );
}

#[tokio::test]
async fn test_slow_proxy_times_out_each_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = proxied_client(&server, default_headers(), retry(2, Duration::from_millis(10)));
    let result = client
        .fetch_with_timeout("http://example.com/", Duration::from_millis(200))
        .await;

    assert_eq!(
        result,
        Err(FetchError::Exhausted {
            attempts: 2,
            last: TransientKind::Timeout
        })
    );
}

#[tokio::test]
async fn test_rejected_urls_never_reach_proxy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = proxied_client(&server, default_headers(), retry(3, Duration::from_millis(10)));

    for url in [
        "http://127.0.0.1/",
        "http://192.168.1.1/",
        "http://localhost/",
        "http://intranet.example/",
        "http://example.com:8080/",
        "file:///etc/passwd",
    ] {
        let result = client.fetch(url).await;
        assert!(
            matches!(result, Err(FetchError::Validation { attempts: 0, .. })),
            "{} was not rejected: {:?}",
            url,
            result
        );
    }

    assert!(matches!(
        client.fetch("http://[::ffff:127.0.0.1]/").await,
        Err(FetchError::Validation {
            rejection: Rejection::BlockedAddress { .. },
            ..
        })
    ));
}
