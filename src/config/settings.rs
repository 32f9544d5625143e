use std::time::Duration;

use serde::Deserialize;

pub const MAX_ATTEMPTS_DEFAULT: u32 = 5;
pub const INTER_ATTEMPT_DELAY_SECONDS_DEFAULT: u64 = 5;
pub const SAFETY_MARGIN_SECONDS_DEFAULT: u64 = 3600;
pub const FAILURE_RETRY_SECONDS_DEFAULT: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    pub safety_margin_seconds: Option<u64>,
    pub failure_retry_seconds: Option<u64>,
    pub fetch: Option<FetchConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// invariant: >= 1
    pub attempts: Option<u32>,
    /// fixed delay between failed attempts, no backoff
    pub retry_delay_seconds: Option<u64>,
}

impl SettingsConfig {
    pub fn attempt_policy(&self) -> FetchAttemptPolicy {
        let fetch = self.fetch.as_ref();
        FetchAttemptPolicy {
            max_attempts: fetch
                .and_then(|f| f.attempts)
                .unwrap_or(MAX_ATTEMPTS_DEFAULT)
                .max(1),
            inter_attempt_delay: Duration::from_secs(
                fetch
                    .and_then(|f| f.retry_delay_seconds)
                    .unwrap_or(INTER_ATTEMPT_DELAY_SECONDS_DEFAULT),
            ),
        }
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            safety_margin: Duration::from_secs(
                self.safety_margin_seconds
                    .unwrap_or(SAFETY_MARGIN_SECONDS_DEFAULT),
            ),
            failure_retry_interval: Duration::from_secs(
                self.failure_retry_seconds
                    .unwrap_or(FAILURE_RETRY_SECONDS_DEFAULT),
            ),
        }
    }
}

/// Bounded retry for one fetch operation.
#[derive(Debug, Clone)]
pub struct FetchAttemptPolicy {
    pub max_attempts: u32,
    pub inter_attempt_delay: Duration,
}

impl Default for FetchAttemptPolicy {
    fn default() -> Self {
        SettingsConfig::default().attempt_policy()
    }
}

/// Scheduling policy for the background refresh loop.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// subtracted from time-to-expiry to pick the next refresh instant
    pub safety_margin: Duration,
    /// fixed interval between refresh attempts after a failure
    pub failure_retry_interval: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        SettingsConfig::default().refresh_policy()
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "json".to_string())
            .to_lowercase()
            .as_str()
        {
            "compact" | "text" => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}
