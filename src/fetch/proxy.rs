use crate::config::{read_api_key, ProxyConfig};
use crate::ConfigError;
use std::fmt;
use url::Url;

/// Third-party fetch proxy every outbound request is routed through
///
/// A validated target becomes `<endpoint>?api_key=<KEY>&url=<encoded target>`.
/// The wrapped URL carries the key, so it is never logged.
#[derive(Clone)]
pub struct ProxyEndpoint {
    endpoint: Url,
    api_key: String,
}

impl fmt::Debug for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyEndpoint")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ProxyEndpoint {
    /// Creates an endpoint from a base URL and API key
    ///
    /// # Returns
    ///
    /// * `Err(ConfigError::InvalidUrl)` - `endpoint` does not parse
    /// * `Err(ConfigError::MissingApiKey)` - `api_key` is blank
    pub fn new(endpoint: &str, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy endpoint: {}", e)))?;

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey("api_key argument".to_string()));
        }

        Ok(Self { endpoint, api_key })
    }

    /// Builds the endpoint from configuration, reading the key from the environment
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let api_key = read_api_key(config)?;
        Self::new(&config.endpoint, api_key)
    }

    /// The proxy base URL (without credentials)
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Wraps `target` into the proxy request URL
    pub fn wrap(&self, target: &Url) -> Url {
        let mut wrapped = self.endpoint.clone();
        let query = format!(
            "api_key={}&url={}",
            urlencoding::encode(&self.api_key),
            urlencoding::encode(target.as_str())
        );
        wrapped.set_query(Some(&query));
        wrapped
    }
}
