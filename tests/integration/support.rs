//! Shared fixtures: a fixed resolver, a scripted transport and log capture

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use scrape_guard::batch::BatchOptions;
use scrape_guard::fetch::{
    AttemptError, BackoffPolicy, OutboundRequest, ProxyEndpoint, RequestHeaders, RetrySettings,
    Transport,
};
use scrape_guard::url::StaticResolver;
use scrape_guard::{ScrapeClient, UrlValidator};
use std::collections::HashMap;
use std::io::Write;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::fmt::MakeWriter;

pub const API_KEY: &str = "test-key";

/// Resolver with a few public hosts and the usual private ones
pub fn test_resolver() -> StaticResolver {
    let public: IpAddr = "93.184.216.34".parse().unwrap();

    let mut resolver = StaticResolver::new()
        .with_host("localhost", &["127.0.0.1".parse().unwrap()])
        .with_host("intranet.example", &["10.0.0.5".parse().unwrap()])
        .with_host(
            "mixed.example",
            &[public, "192.168.1.10".parse().unwrap()],
        );
    for host in [
        "example.com",
        "example.org",
        "fast.example",
        "slow.example",
        "hang.example",
        "panic.example",
        "a.example",
        "b.example",
        "c.example",
    ] {
        resolver = resolver.with_host(host, &[public]);
    }
    resolver
}

pub fn test_validator() -> UrlValidator {
    UrlValidator::new(Arc::new(test_resolver()))
}

pub fn retry(max_attempts: u32, base: Duration) -> RetrySettings {
    RetrySettings {
        max_attempts,
        backoff: BackoffPolicy::with_base(base),
    }
}

/// Client over `transport` with a fixed resolver and a dummy proxy
pub fn client_with(transport: Arc<dyn Transport>, retry: RetrySettings, timeout: Duration) -> ScrapeClient {
    ScrapeClient::with_parts(
        test_validator(),
        transport,
        ProxyEndpoint::new("http://proxy.test", API_KEY).unwrap(),
        RequestHeaders::new(["TestAgent/1.0"], HeaderMap::new()).unwrap(),
        retry,
        timeout,
        BatchOptions::default(),
    )
}

/// How [`HostTransport`] answers for one host
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Responds with the body after the delay
    Respond(Duration, String),
    /// Never responds
    Hang,
    /// Panics inside the fetch
    Panic,
    /// Fails every attempt
    Fail(AttemptError),
}

/// Transport answering per target host and recording every call
#[derive(Default)]
pub struct HostTransport {
    routes: HashMap<String, Behavior>,
    calls: Mutex<Vec<String>>,
    finished: Mutex<Vec<(String, Instant)>>,
}

impl HostTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, host: &str, behavior: Behavior) -> Self {
        self.routes.insert(host.to_string(), behavior);
        self
    }

    /// Target URLs requested, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, host: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains(host))
            .count()
    }

    /// When each successful response was produced
    pub fn finished_at(&self) -> Vec<(String, Instant)> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for HostTransport {
    async fn get(&self, request: &OutboundRequest) -> Result<String, AttemptError> {
        let target = request.target.to_string();
        self.calls.lock().unwrap().push(target.clone());

        let host = request.target.host_str().unwrap_or_default();
        match self.routes.get(host).cloned() {
            Some(Behavior::Respond(delay, body)) => {
                tokio::time::sleep(delay).await;
                self.finished.lock().unwrap().push((target, Instant::now()));
                Ok(body)
            }
            Some(Behavior::Hang) => std::future::pending().await,
            Some(Behavior::Panic) => panic!("transport blew up for {}", host),
            Some(Behavior::Fail(error)) => Err(error),
            None => Ok(format!("body of {}", host)),
        }
    }
}

/// In-memory sink for formatted log output
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Installs a debug-level subscriber writing into a fresh buffer for the
/// current thread
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
