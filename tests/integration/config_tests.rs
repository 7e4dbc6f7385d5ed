//! Loading configuration files and building a client from them

use scrape_guard::config::{load_config, load_config_with_hash};
use scrape_guard::{ConfigError, ScrapeClient, ScrapeError};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_config_file() {
    let file = write_config(
        r#"
[fetch]
max-attempts = 5
backoff-base-ms = 250
backoff-cap-ms = 4000

[batch]
max-workers = 8
task-timeout-seconds = 30

[proxy]
endpoint = "https://proxy.internal.test"
api-key-env = "SCRAPE_GUARD_IT_CONFIG_KEY"

[http]
user-agents = ["Agent/1", "Agent/2"]
headers = { "Accept-Language" = "en" }
"#,
    );

    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    assert_eq!(hash.len(), 64);
    assert_eq!(config.fetch.max_attempts, 5);
    assert_eq!(config.fetch.backoff_base(), Duration::from_millis(250));
    assert_eq!(config.batch.max_workers, 8);
    assert_eq!(config.batch.task_timeout(), Duration::from_secs(30));
    assert_eq!(config.proxy.endpoint, "https://proxy.internal.test");
    assert_eq!(config.http.user_agents.len(), 2);
    assert_eq!(config.http.headers["Accept-Language"], "en");
}

#[test]
fn test_out_of_range_values_rejected() {
    let file = write_config("[batch]\nmax-workers = 0\n");
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::Validation(_))
    ));

    let file = write_config("[fetch]\nbackoff-base-ms = 5000\nbackoff-cap-ms = 100\n");
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_client_requires_api_key() {
    let file = write_config("[proxy]\napi-key-env = \"SCRAPE_GUARD_IT_NEVER_SET\"\n");
    let config = load_config(file.path()).unwrap();

    let result = ScrapeClient::from_config(&config);
    assert!(matches!(
        result,
        Err(ScrapeError::Config(ConfigError::MissingApiKey(_)))
    ));
}

#[tokio::test]
async fn test_client_from_config_with_key() {
    std::env::set_var("SCRAPE_GUARD_IT_PRESENT_KEY", "abc123");
    let file = write_config("[proxy]\napi-key-env = \"SCRAPE_GUARD_IT_PRESENT_KEY\"\n");
    let config = load_config(file.path()).unwrap();

    let client = ScrapeClient::from_config(&config).unwrap();
    assert_eq!(client.batch_options().max_workers, 3);
    assert!(!client.validate("http://127.0.0.1/").await);
}
