//! Configuration loader and validator for the notification sender.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::farcaster::NOTIFICATION_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly. Only the
/// `notification` section is mandatory; everything else falls back to the
/// defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub source: Source,
    pub notification: Notification,
    #[serde(default)]
    pub delivery: Delivery,
    #[serde(default)]
    pub output: Output,
}

/// Recipient source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    #[serde(default = "defaults::csv_path")]
    pub csv_path: String,
}

/// Campaign content stamped into every payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub target_url: String,
}

/// Endpoint and pacing knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delivery {
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,
    #[serde(default = "defaults::batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,
    #[serde(default = "defaults::retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "defaults::request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Output artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Output {
    #[serde(default = "defaults::failures_path")]
    pub failures_path: String,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            csv_path: defaults::csv_path(),
        }
    }
}

impl Default for Delivery {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            user_agent: defaults::user_agent(),
            batch_size: defaults::batch_size(),
            batch_delay_ms: defaults::batch_delay_ms(),
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay_ms(),
            request_timeout_ms: defaults::request_timeout_ms(),
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self {
            failures_path: defaults::failures_path(),
        }
    }
}

impl Delivery {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

mod defaults {
    use super::NOTIFICATION_URL;

    pub fn csv_path() -> String {
        "users.csv".to_string()
    }

    pub fn endpoint() -> String {
        NOTIFICATION_URL.to_string()
    }

    pub fn user_agent() -> String {
        "fc-notify/0.1".to_string()
    }

    pub const fn batch_size() -> usize {
        40
    }

    pub const fn batch_delay_ms() -> u64 {
        3000
    }

    pub const fn max_retries() -> u32 {
        1
    }

    pub const fn retry_delay_ms() -> u64 {
        1000
    }

    pub const fn request_timeout_ms() -> u64 {
        30_000
    }

    pub fn failures_path() -> String {
        "failed_notifications.json".to_string()
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.source.csv_path.trim().is_empty() {
        return Err(ConfigError::Invalid("source.csv_path must be non-empty"));
    }

    if cfg.notification.title.trim().is_empty() {
        return Err(ConfigError::Invalid("notification.title must be non-empty"));
    }
    if cfg.notification.body.trim().is_empty() {
        return Err(ConfigError::Invalid("notification.body must be non-empty"));
    }
    if !is_http_url(&cfg.notification.target_url) {
        return Err(ConfigError::Invalid(
            "notification.target_url must be an http(s) URL",
        ));
    }

    if !is_http_url(&cfg.delivery.endpoint) {
        return Err(ConfigError::Invalid(
            "delivery.endpoint must be an http(s) URL",
        ));
    }
    if cfg.delivery.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("delivery.user_agent must be non-empty"));
    }
    if cfg.delivery.batch_size == 0 {
        return Err(ConfigError::Invalid("delivery.batch_size must be > 0"));
    }
    // max_retries is u32; zero simply disables retries

    if cfg.output.failures_path.trim().is_empty() {
        return Err(ConfigError::Invalid("output.failures_path must be non-empty"));
    }

    Ok(())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Returns an example YAML config with every knob spelled out.
pub fn example() -> &'static str {
    r#"source:
  csv_path: "users.csv"

notification:
  title: "New prize pool added!"
  body: "Come back and climb the leaderboard before the round closes."
  target_url: "https://your-mini-app.example.com/"

delivery:
  endpoint: "https://api.farcaster.xyz/v1/frame-notifications"
  user_agent: "fc-notify/0.1"
  batch_size: 40
  batch_delay_ms: 3000
  max_retries: 1
  retry_delay_ms: 1000
  request_timeout_ms: 30000

output:
  failures_path: "failed_notifications.json"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.delivery.batch_size, 40);
        assert_eq!(cfg.output.failures_path, "failed_notifications.json");
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let yaml = r#"notification:
  title: "Hello"
  body: "World"
  target_url: "https://app.example.com/"
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.source.csv_path, "users.csv");
        assert_eq!(cfg.delivery.endpoint, NOTIFICATION_URL);
        assert_eq!(cfg.delivery.batch_size, 40);
        assert_eq!(cfg.delivery.batch_delay_ms, 3000);
        assert_eq!(cfg.delivery.max_retries, 1);
        assert_eq!(cfg.delivery.retry_delay_ms, 1000);
        assert_eq!(cfg.delivery.request_timeout_ms, 30_000);
        assert_eq!(cfg.output.failures_path, "failed_notifications.json");
    }

    #[test]
    fn partial_delivery_section_keeps_other_defaults() {
        let yaml = r#"notification:
  title: "Hello"
  body: "World"
  target_url: "https://app.example.com/"

delivery:
  batch_size: 10
  max_retries: 3
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.delivery.batch_size, 10);
        assert_eq!(cfg.delivery.max_retries, 3);
        assert_eq!(cfg.delivery.batch_delay_ms, 3000);
        assert_eq!(cfg.delivery.endpoint, NOTIFICATION_URL);
    }

    #[test]
    fn invalid_notification_content() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.notification.title = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("notification.title")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.notification.body = "  ".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.notification.target_url = "ftp://example.com".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("target_url")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_delivery_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.delivery.batch_size = 0;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("batch_size")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.delivery.endpoint = "not-a-url".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("delivery.endpoint")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn delay_helpers_convert_millis() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        assert_eq!(cfg.delivery.batch_delay(), Duration::from_secs(3));
        assert_eq!(cfg.delivery.retry_delay(), Duration::from_secs(1));
        assert_eq!(cfg.delivery.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.notification.title, "New prize pool added!");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let td = tempdir().unwrap();
        let p = td.path().join("nope.yaml");
        let err = load(Some(&p)).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
