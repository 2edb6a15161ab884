use serde::Deserialize;
use std::fmt;

/// Default base URL of the remote comment API
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Default minimum gap between outbound dispatches (milliseconds)
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 250;

/// Default score a thread must exceed to be expanded during a smart scan
pub const DEFAULT_PROMISING_SCORE: u8 = 10;

/// Environment variable that overrides `[api].key`
pub const API_KEY_ENV: &str = "SLEUTH_API_KEY";

/// Main configuration structure for Comment-Sleuth
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    pub output: OutputConfig,
}

/// Remote API configuration
#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL the three comment endpoints hang off
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// API key; may instead come from the environment
    #[serde(default)]
    pub key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            key: None,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Outbound request pacing
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Minimum time between the start of consecutive requests (milliseconds)
    #[serde(rename = "min-interval-ms", default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

/// Scan strategy tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Threads scoring above this are expanded inline by a smart scan
    #[serde(rename = "promising-score", default = "default_promising_score")]
    pub promising_score: u8,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            promising_score: default_promising_score(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_min_interval_ms() -> u64 {
    DEFAULT_MIN_INTERVAL_MS
}

fn default_promising_score() -> u8 {
    DEFAULT_PROMISING_SCORE
}

/// An API key that has already passed format validation
///
/// The crawler never inspects the key; it is forwarded verbatim as the `key`
/// query parameter. `Debug` output is redacted so keys stay out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedKey(String);

impl ValidatedKey {
    /// Wraps a key that the settings layer has already checked
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ValidatedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValidatedKey(<redacted>)")
    }
}
