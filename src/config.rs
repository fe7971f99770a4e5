//! Tap configuration
//!
//! Typed configuration for tap-keen, loaded from a JSON file or inline JSON
//! and validated once at startup. Every downstream component reads from this
//! struct rather than poking at raw JSON.

use crate::error::{Error, Result};
use crate::window::parse_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Default Keen API base URL
pub const DEFAULT_API_URL: &str = "https://api.keen.io/3.0";

// ============================================================================
// Tap Config
// ============================================================================

/// Complete tap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Keen project to extract from
    pub project_id: String,

    /// Read-scoped API key, sent as the `Authorization` header
    pub read_key: String,

    /// Earliest record date to sync (required on the first run, when no
    /// state exists yet)
    #[serde(default, deserialize_with = "deserialize_opt_datetime")]
    pub start_date: Option<DateTime<Utc>>,

    /// Latest record date to sync; defaults to "now" captured at stream
    /// start
    #[serde(default, deserialize_with = "deserialize_opt_datetime")]
    pub end_date: Option<DateTime<Utc>>,

    /// Max number of hours of data to fetch in one request window
    #[serde(default = "default_fetch_interval")]
    pub max_fetch_interval_hours: f64,

    /// Optional User-Agent header value
    #[serde(default)]
    pub user_agent: Option<String>,

    /// API base URL (override for testing)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP transport tuning
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_fetch_interval() -> f64 {
    1.0
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// HTTP client tuning block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum retries for retryable failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side rate limit (requests per second); 0 disables
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            rate_limit_per_second: default_rate_limit(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_rate_limit() -> u32 {
    10
}

impl TapConfig {
    /// Load config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Load config from an inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from an already-parsed JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| Error::config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Runs once at startup so every failure mode here is caught before the
    /// first request goes out.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.is_empty() {
            return Err(Error::missing_field("project_id"));
        }
        if self.read_key.is_empty() {
            return Err(Error::missing_field("read_key"));
        }

        if !self.max_fetch_interval_hours.is_finite() || self.max_fetch_interval_hours <= 0.0 {
            return Err(Error::invalid_value(
                "max_fetch_interval_hours",
                format!(
                    "must be a positive number of hours, got {}",
                    self.max_fetch_interval_hours
                ),
            ));
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(Error::invalid_value(
                    "end_date",
                    format!("end_date {end} is before start_date {start}"),
                ));
            }
        }

        url::Url::parse(&self.api_url)
            .map_err(|e| Error::invalid_value("api_url", format!("not a valid URL: {e}")))?;

        if self.http.timeout_secs == 0 {
            return Err(Error::invalid_value("http.timeout_secs", "must be non-zero"));
        }

        Ok(())
    }

    /// Base URL for this project's API, e.g.
    /// `https://api.keen.io/3.0/projects/<project_id>`
    pub fn project_url(&self) -> String {
        format!(
            "{}/projects/{}",
            self.api_url.trim_end_matches('/'),
            self.project_id
        )
    }

    /// Default headers carried on every request
    pub fn http_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), self.read_key.clone());
        if let Some(agent) = &self.user_agent {
            headers.insert("User-Agent".to_string(), agent.clone());
        }
        headers
    }
}

/// Deserialize an optional datetime from any of the accepted layouts
/// (RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, ...)
fn deserialize_opt_datetime<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value {
        Some(s) if !s.is_empty() => parse_datetime(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
