use crate::config::types::{BatchConfig, Config, FetchConfig, HttpConfig, ProxyConfig};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_batch_config(&config.batch)?;
    validate_proxy_config(&config.proxy)?;
    validate_http_config(&config.http)?;
    Ok(())
}

/// Checks that `value` lies in `min..=max`
fn check_range<T>(name: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(ConfigError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    check_range("timeout-seconds", config.timeout_seconds, 1, 300)?;
    check_range("max-attempts", config.max_attempts, 1, 10)?;
    check_range("backoff-base-ms", config.backoff_base_ms, 1, 60_000)?;
    check_range("resolver-timeout-ms", config.resolver_timeout_ms, 100, 60_000)?;

    if config.backoff_cap_ms < config.backoff_base_ms || config.backoff_cap_ms > 600_000 {
        return Err(ConfigError::Validation(format!(
            "backoff-cap-ms must be between backoff-base-ms ({}) and 600000, got {}",
            config.backoff_base_ms, config.backoff_cap_ms
        )));
    }

    Ok(())
}

/// Validates batch configuration
fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    check_range("max-workers", config.max_workers, 1, 32)?;
    check_range("task-timeout-seconds", config.task_timeout_seconds, 1, 3600)?;
    Ok(())
}

/// Validates proxy configuration
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy endpoint: {}", e)))?;

    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "Proxy endpoint must use http or https, got '{}'",
            endpoint.scheme()
        )));
    }

    if endpoint.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(
            "Proxy endpoint has no host".to_string(),
        ));
    }

    if endpoint.query().is_some() {
        return Err(ConfigError::InvalidUrl(
            "Proxy endpoint must not carry a query string".to_string(),
        ));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api-key-env cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates header configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one entry".to_string(),
        ));
    }

    for agent in &config.user_agents {
        if agent.trim().is_empty() || HeaderValue::from_str(agent).is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid user agent: '{}'",
                agent
            )));
        }
    }

    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ConfigError::Validation(format!("Invalid header name: '{}'", name))
        })?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
    }

    Ok(())
}
