//! Client configuration.
//!
//! A [`ClientConfig`] is built in code or loaded from a JSON file such as
//!
//! ```json
//! { "username": "acme", "apikey": "secret", "timezone": "Z" }
//! ```
//!
//! and never changes once the client holds it.

use std::path::Path;
use std::time::Duration;

use carto_sql_core::TimeZone;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Delay between two polls of a batch job.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Endpoint, credentials and rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, e.g. `https://acme.carto.com/api/v2`, without trailing slash.
    pub base_url: String,
    pub api_key: String,
    /// Zone timestamps are rendered in.
    pub timezone: TimeZone,
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Creates a config for an explicit API root.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timezone: TimeZone::Local,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Creates a config for the hosted account of `user`.
    #[must_use]
    pub fn for_user(user: &str, api_key: impl Into<String>) -> Self {
        Self::new(format!("https://{user}.carto.com/api/v2"), api_key)
    }

    #[must_use]
    pub const fn with_timezone(mut self, timezone: TimeZone) -> Self {
        self.timezone = timezone;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// `<base>/sql`
    #[must_use]
    pub fn sql_url(&self) -> String {
        format!("{}/sql", self.base_url)
    }

    /// `<base>/sql/job`
    #[must_use]
    pub fn job_url(&self) -> String {
        format!("{}/sql/job", self.base_url)
    }

    /// `<base>/sql/job/<id>`
    #[must_use]
    pub fn job_status_url(&self, job_id: &str) -> String {
        format!("{}/sql/job/{job_id}", self.base_url)
    }

    /// Parses a JSON config document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed JSON, a missing endpoint, or an
    /// unparsable timezone.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ConfigFile =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        file.into_config()
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default, alias = "user")]
    username: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(alias = "apikey")]
    api_key: String,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    poll_interval_ms: Option<u64>,
}

impl ConfigFile {
    fn into_config(self) -> Result<ClientConfig> {
        let mut config = match (self.base_url, self.username) {
            (Some(base_url), _) => ClientConfig::new(base_url, self.api_key),
            (None, Some(user)) => ClientConfig::for_user(&user, self.api_key),
            (None, None) => {
                return Err(Error::Config(String::from(
                    "either `base_url` or `username` is required",
                )))
            }
        };
        if let Some(tz) = self.timezone {
            config.timezone = tz.parse().map_err(|e| Error::Config(format!("{e}")))?;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_user() {
        let config = ClientConfig::for_user("acme", "k");
        assert_eq!(config.base_url, "https://acme.carto.com/api/v2");
        assert_eq!(config.sql_url(), "https://acme.carto.com/api/v2/sql");
        assert_eq!(config.job_status_url("abc"), "https://acme.carto.com/api/v2/sql/job/abc");
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.timezone, TimeZone::Local);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        assert_eq!(ClientConfig::new("http://h/api/v2/", "k").sql_url(), "http://h/api/v2/sql");
    }

    #[test]
    fn test_from_json_user_and_apikey() {
        let config = ClientConfig::from_json_str(
            r#"{"username": "acme", "apikey": "secret", "timezone": "+02:00", "poll_interval_ms": 10}"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://acme.carto.com/api/v2");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.timezone, "+02:00".parse::<TimeZone>().unwrap());
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_from_json_base_url_wins() {
        let config = ClientConfig::from_json_str(
            r#"{"username": "acme", "base_url": "http://localhost:8080/api/v2", "api_key": "k"}"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/api/v2");
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            ClientConfig::from_json_str(r#"{"api_key": "k"}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_json_str(r#"{"username": "u", "api_key": "k", "timezone": "Mars"}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(ClientConfig::from_json_str("{"), Err(Error::Config(_))));
    }
}
