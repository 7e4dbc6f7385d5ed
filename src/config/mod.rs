//! Configuration module for Scrape-Guard
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; omitted values fall back to conservative defaults.
//!
//! # Example
//!
//! ```no_run
//! use scrape_guard::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scrape-guard.toml")).unwrap();
//! println!("Fetching with {} workers", config.batch.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BatchConfig, Config, FetchConfig, HttpConfig, ProxyConfig, DEFAULT_API_KEY_ENV,
    DEFAULT_PROXY_ENDPOINT, DEFAULT_USER_AGENTS,
};

// Re-export parser functions
pub use parser::{
    api_key_from, apply_timeout_override, compute_config_hash, default_config, load_config,
    load_config_with_hash, read_api_key, TIMEOUT_ENV,
};
pub use validation::validate;
