//! SSRF gate for caller-supplied URLs
//!
//! A URL passes only if every check holds:
//!
//! 1. It parses and its scheme is exactly `http` or `https`
//! 2. It has a non-empty host
//! 3. Any explicit port is 80 or 443
//! 4. Its hostname resolves (IP literals are taken as-is)
//! 5. Every resolved address is public
//!
//! One blocked address among several public ones rejects the whole URL.
//! Checks run on the raw caller string; sanitization is applied only to what
//! gets logged.

use crate::url::address::blocked_range;
use crate::url::resolver::{Resolve, SystemResolver};
use crate::url::sanitize::sanitize_for_log;
use crate::url::{Rejection, Verdict};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use url::{Host, Url};

/// Ports that may appear explicitly in a URL
pub const ALLOWED_PORTS: &[u16] = &[80, 443];

/// Validates URLs against the scheme, port and address policy
#[derive(Clone)]
pub struct UrlValidator {
    resolver: Arc<dyn Resolve>,
}

impl std::fmt::Debug for UrlValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlValidator").finish_non_exhaustive()
    }
}

impl UrlValidator {
    /// Creates a validator that resolves hostnames through `resolver`
    pub fn new(resolver: Arc<dyn Resolve>) -> Self {
        Self { resolver }
    }

    /// Creates a validator backed by the system resolver
    pub fn system(resolver_timeout: Duration) -> Self {
        Self::new(Arc::new(SystemResolver::new(resolver_timeout)))
    }

    /// Returns true if `raw` may be fetched
    ///
    /// Never fails: parse and resolution errors are a `false` verdict.
    pub async fn validate(&self, raw: &str) -> bool {
        self.check(raw).await.is_valid()
    }

    /// Evaluates `raw` and returns the verdict with its reason
    ///
    /// Each call performs a fresh DNS lookup.
    pub async fn check(&self, raw: &str) -> Verdict {
        match self.evaluate(raw).await {
            Ok(addresses) => {
                tracing::debug!(
                    url = %sanitize_for_log(raw),
                    addresses = ?addresses,
                    "URL accepted"
                );
                Verdict::Allowed { addresses }
            }
            Err(rejection) => {
                tracing::debug!(
                    url = %sanitize_for_log(raw),
                    reason = %rejection,
                    "URL rejected"
                );
                Verdict::Rejected(rejection)
            }
        }
    }

    async fn evaluate(&self, raw: &str) -> Result<Vec<IpAddr>, Rejection> {
        let url = Url::parse(raw).map_err(Rejection::Parse)?;

        check_scheme(&url)?;
        let host = url.host().ok_or(Rejection::MissingHost)?;
        check_port(&url)?;

        let addresses = match host {
            Host::Ipv4(ip) => vec![IpAddr::V4(ip)],
            Host::Ipv6(ip) => vec![IpAddr::V6(ip)],
            Host::Domain(name) => {
                if name.is_empty() {
                    return Err(Rejection::MissingHost);
                }
                self.resolver
                    .resolve(name)
                    .await
                    .map_err(Rejection::Resolution)?
            }
        };

        check_addresses(url.host_str().unwrap_or_default(), &addresses)?;

        Ok(addresses)
    }
}

fn check_scheme(url: &Url) -> Result<(), Rejection> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Rejection::Scheme(other.to_string())),
    }
}

/// `Url::port` already reports a scheme-default port as absent
fn check_port(url: &Url) -> Result<(), Rejection> {
    match url.port() {
        Some(port) if !ALLOWED_PORTS.contains(&port) => Err(Rejection::Port(port)),
        _ => Ok(()),
    }
}

fn check_addresses(host: &str, addresses: &[IpAddr]) -> Result<(), Rejection> {
    for ip in addresses {
        if let Some(range) = blocked_range(*ip) {
            return Err(Rejection::BlockedAddress {
                host: host.to_string(),
                ip: *ip,
                range,
            });
        }
    }
    Ok(())
}
