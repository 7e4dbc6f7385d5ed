use crate::config::types::{Config, ProxyConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable overriding `fetch.timeout-seconds`
pub const TIMEOUT_ENV: &str = "SCRAPER_TIMEOUT";

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied after parsing and before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use scrape_guard::config::load_config;
///
/// let config = load_config(Path::new("scrape-guard.toml")).unwrap();
/// println!("Workers: {}", config.batch.max_workers);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    finish(config)
}

/// Returns the default configuration with environment overrides applied
pub fn default_config() -> Result<Config, ConfigError> {
    finish(Config::default())
}

fn finish(mut config: Config) -> Result<Config, ConfigError> {
    apply_timeout_override(&mut config, std::env::var(TIMEOUT_ENV).ok().as_deref());
    validate(&config)?;
    Ok(config)
}

/// Applies a `SCRAPER_TIMEOUT`-style override
///
/// Values that do not parse as an integer are ignored with a warning.
pub fn apply_timeout_override(config: &mut Config, value: Option<&str>) {
    let Some(raw) = value else {
        return;
    };

    match raw.trim().parse::<u64>() {
        Ok(seconds) => config.fetch.timeout_seconds = seconds,
        Err(_) => tracing::warn!("Ignoring non-numeric {} value", TIMEOUT_ENV),
    }
}

/// Reads the proxy API key from the environment
///
/// A missing or blank key is fatal: the fetch layer never falls back to
/// direct requests.
pub fn read_api_key(proxy: &ProxyConfig) -> Result<String, ConfigError> {
    api_key_from(proxy, |name| std::env::var(name).ok())
}

/// Resolves the API key through an arbitrary variable lookup
pub fn api_key_from<F>(proxy: &ProxyConfig, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(&proxy.api_key_env)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ConfigError::MissingApiKey(proxy.api_key_env.clone()))
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
