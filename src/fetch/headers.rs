use crate::config::HttpConfig;
use crate::ConfigError;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Builds the header set for each outbound request
///
/// Every request gets a User-Agent picked at random from the pool, `DNT: 1`
/// and a browser-like `Accept`. Configured extra headers are applied last
/// and replace any default with the same (case-insensitive) name, including
/// the User-Agent.
#[derive(Debug, Clone)]
pub struct RequestHeaders {
    user_agents: Vec<HeaderValue>,
    extra: HeaderMap,
}

impl RequestHeaders {
    /// Creates a header builder from a User-Agent pool and extra headers
    pub fn new<I, S>(user_agents: I, extra: HeaderMap) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let user_agents = user_agents
            .into_iter()
            .map(|agent| {
                HeaderValue::from_str(agent.as_ref()).map_err(|_| {
                    ConfigError::Validation(format!("Invalid user agent: '{}'", agent.as_ref()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if user_agents.is_empty() {
            return Err(ConfigError::Validation(
                "user-agents must contain at least one entry".to_string(),
            ));
        }

        Ok(Self { user_agents, extra })
    }

    /// Builds the header builder from the `[http]` config section
    pub fn from_config(config: &HttpConfig) -> Result<Self, ConfigError> {
        let mut extra = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::Validation(format!("Invalid header name: '{}'", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ConfigError::Validation(format!("Invalid value for header '{}'", name)))?;
            extra.insert(name, value);
        }

        Self::new(&config.user_agents, extra)
    }

    /// Headers for one request
    pub fn build(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(agent) = self.user_agents.choose(&mut rand::thread_rng()) {
            headers.insert(USER_AGENT, agent.clone());
        }
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));

        for (name, value) in &self.extra {
            headers.insert(name.clone(), value.clone());
        }

        headers
    }
}
