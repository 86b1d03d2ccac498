//! Engine configuration: service location, timeouts, retry and polling policy.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_CAPABILITIES_TTL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_POLL_INTERVAL, DEFAULT_POLL_MAX_ERRORS, DEFAULT_RELEASE_DELAY,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_BASE_DELAY, MAX_TIMEOUT,
};
use crate::transport::RetryPolicy;

/// Errors raised while building or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL is not an absolute http(s) URL.
    #[error("invalid service base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A numeric setting is outside its accepted range.
    #[error("invalid value for `{field}`: {value} (expected {expected})")]
    OutOfRange {
        /// Setting name as it appears in the config file.
        field: &'static str,
        /// The rejected value, rendered for display.
        value: String,
        /// Human-readable accepted range.
        expected: &'static str,
    },

    /// reqwest could not build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Settings for an [`ExportEngine`](crate::ExportEngine).
///
/// # Default Values
///
/// | Field | Default |
/// |-------|---------|
/// | `base_url` | `http://localhost:8001/api/export/` |
/// | `request_timeout` | 30s |
/// | `connect_timeout` | 10s |
/// | `max_attempts` | 3 |
/// | `retry_base_delay` | 1s |
/// | `poll_interval` | 2s |
/// | `poll_max_errors` | 5 |
/// | `capabilities_ttl` | 5 min |
/// | `download_release_delay` | 100ms |
/// | `output_dir` | `.` |
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Service base URL; always ends with `/` so endpoint paths join beneath it.
    pub base_url: Url,
    /// Hard timeout for each transport attempt.
    pub request_timeout: Duration,
    /// TCP connect timeout for the HTTP client.
    pub connect_timeout: Duration,
    /// Attempts per transport call, including the first.
    pub max_attempts: u32,
    /// Linear backoff unit between transport attempts.
    pub retry_base_delay: Duration,
    /// Delay between successful status polls.
    pub poll_interval: Duration,
    /// Consecutive transient poll failures tolerated.
    pub poll_max_errors: u32,
    /// Validity window of cached capabilities.
    pub capabilities_ttl: Duration,
    /// How long the temporary artifact handle outlives the start of a save.
    pub download_release_delay: Duration,
    /// Destination directory for downloaded artifacts.
    pub output_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_max_errors: DEFAULT_POLL_MAX_ERRORS,
            capabilities_ttl: DEFAULT_CAPABILITIES_TTL,
            download_release_delay: DEFAULT_RELEASE_DELAY,
            output_dir: PathBuf::from("."),
        }
    }
}

#[allow(clippy::expect_used)]
fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is a valid constant")
}

impl EngineConfig {
    /// Creates a default config pointing at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the URL does not parse or is not http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_poll_max_errors(mut self, max_errors: u32) -> Self {
        self.poll_max_errors = max_errors;
        self
    }

    #[must_use]
    pub fn with_capabilities_ttl(mut self, ttl: Duration) -> Self {
        self.capabilities_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_download_release_delay(mut self, delay: Duration) -> Self {
        self.download_release_delay = delay;
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Retry policy for single transport calls derived from this config.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            self.retry_base_delay,
            self.request_timeout,
        )
    }

    /// Checks every setting against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("request_timeout_secs", self.request_timeout)?;
        validate_timeout("connect_timeout_secs", self.connect_timeout)?;
        if !(1..=10).contains(&self.max_attempts) {
            return Err(ConfigError::OutOfRange {
                field: "max_attempts",
                value: self.max_attempts.to_string(),
                expected: "1..=10",
            });
        }
        if !(1..=100).contains(&self.poll_max_errors) {
            return Err(ConfigError::OutOfRange {
                field: "poll_max_errors",
                value: self.poll_max_errors.to_string(),
                expected: "1..=100",
            });
        }
        if self.poll_interval.is_zero() || self.poll_interval > MAX_TIMEOUT {
            return Err(ConfigError::OutOfRange {
                field: "poll_interval_ms",
                value: self.poll_interval.as_millis().to_string(),
                expected: "1..=3600000",
            });
        }
        if self.retry_base_delay > MAX_TIMEOUT {
            return Err(ConfigError::OutOfRange {
                field: "retry_base_delay_ms",
                value: self.retry_base_delay.as_millis().to_string(),
                expected: "0..=3600000",
            });
        }
        Ok(())
    }
}

fn validate_timeout(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value < Duration::from_secs(1) || value > MAX_TIMEOUT {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.as_secs_f64().to_string(),
            expected: "1..=3600 seconds",
        });
    }
    Ok(())
}

/// Parses a service base URL, appending the trailing `/` that `Url::join` needs.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBaseUrl`] if the URL does not parse or is not http(s).
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}
