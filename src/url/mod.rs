//! URL handling module for Scrape-Guard
//!
//! This module decides whether a caller-supplied URL may be fetched at all:
//! address classification, hostname resolution, the validator itself, and the
//! sanitizer used whenever a caller string is written to the logs.

mod address;
mod resolver;
mod sanitize;
mod validator;

use std::net::IpAddr;
use thiserror::Error;

// Re-export main types
pub use address::{blocked_range, is_public, BlockedRange};
pub use resolver::{Resolve, ResolveError, StaticResolver, SystemResolver};
pub use sanitize::sanitize_for_log;
pub use validator::{UrlValidator, ALLOWED_PORTS};

/// Reason a URL failed validation
///
/// The `Display` text is safe to show to callers: it never echoes the raw URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("URL could not be parsed: {0}")]
    Parse(::url::ParseError),

    #[error("scheme '{0}' is not allowed")]
    Scheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("port {0} is not allowed")]
    Port(u16),

    #[error("hostname could not be resolved")]
    Resolution(#[source] ResolveError),

    #[error("{host} resolves to {range} address {ip}")]
    BlockedAddress {
        host: String,
        ip: IpAddr,
        range: BlockedRange,
    },
}

/// Outcome of validating one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The URL may be fetched; carries the addresses checked
    Allowed { addresses: Vec<IpAddr> },
    /// The URL must not be fetched
    Rejected(Rejection),
}

impl Verdict {
    /// Returns true if the URL passed every check
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Returns the rejection reason, if any
    pub fn reason(&self) -> Option<&Rejection> {
        match self {
            Self::Allowed { .. } => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    /// Converts the verdict into a `Result` for `?` propagation
    pub fn into_result(self) -> Result<Vec<IpAddr>, Rejection> {
        match self {
            Self::Allowed { addresses } => Ok(addresses),
            Self::Rejected(rejection) => Err(rejection),
        }
    }
}
