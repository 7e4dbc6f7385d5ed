//! Hostname resolution
//!
//! Resolution is behind the [`Resolve`] trait so the validator can be driven
//! by the system resolver in production and by a fixed table in tests. No
//! implementation caches: a cached answer would hide a rebinding between
//! validation and connection.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// DNS resolution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("DNS lookup for {host} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },

    #[error("DNS lookup for {host} failed: {message}")]
    Lookup { host: String, message: String },

    #[error("DNS lookup for {host} returned no addresses")]
    NoAddresses { host: String },
}

/// Resolves a hostname to every address it currently maps to
///
/// Implementations must return all A and AAAA records, not just the first,
/// so that a host with one private address among public ones is caught.
///
/// This trait uses `async_trait` so validators can hold `Arc<dyn Resolve>`.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio)
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let lookup = tokio::net::lookup_host((host, 0));

        let addrs = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| ResolveError::Timeout {
                host: host.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| ResolveError::Lookup {
                host: host.to_string(),
                message: e.to_string(),
            })?;

        collect_addresses(host, addrs.map(|addr| addr.ip()))
    }
}

/// Resolver answering from a fixed table
///
/// Unknown hosts fail with [`ResolveError::Lookup`]. Every call is counted so
/// tests can assert that lookups are not cached.
#[derive(Debug, Default)]
pub struct StaticResolver {
    table: HashMap<String, Vec<IpAddr>>,
    lookups: AtomicUsize,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the addresses for `host`
    pub fn with_host(mut self, host: &str, ips: &[IpAddr]) -> Self {
        self.table.insert(host.to_ascii_lowercase(), ips.to_vec());
        self
    }

    /// Number of lookups served so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolve for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        match self.table.get(&host.to_ascii_lowercase()) {
            Some(ips) => collect_addresses(host, ips.iter().copied()),
            None => Err(ResolveError::Lookup {
                host: host.to_string(),
                message: "host not found".to_string(),
            }),
        }
    }
}

/// Deduplicates and sorts resolved addresses, failing on an empty answer
fn collect_addresses<I>(host: &str, ips: I) -> Result<Vec<IpAddr>, ResolveError>
where
    I: IntoIterator<Item = IpAddr>,
{
    let unique: BTreeSet<IpAddr> = ips.into_iter().collect();

    if unique.is_empty() {
        return Err(ResolveError::NoAddresses {
            host: host.to_string(),
        });
    }

    Ok(unique.into_iter().collect())
}
