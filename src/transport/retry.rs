//! Retry classification and backoff schedules.
//!
//! When a call fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - timeouts, connection failures, 5xx
//! - [`FailureType::RateLimited`] - HTTP 429
//! - [`FailureType::Permanent`] - 404 and other 4xx, bad URLs, undecodable bodies, cancellation
//!
//! The [`RetryPolicy`] then decides whether a single transport call is retried,
//! using a linear schedule (`base_delay * attempt`). Status polling has its own
//! exponential schedule, [`poll_backoff`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use exporter_core::transport::{RetryDecision, RetryPolicy, TransportError, classify_error};
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(30));
//! let error = TransportError::http_status("http://svc/capabilities", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(delay, Duration::from_secs(1));
//!         assert_eq!(attempt, 2);
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("{reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::TransportError;
use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_BASE_DELAY};

/// Upper bound on the exponent used by [`poll_backoff`], so the shift cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Classification of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    Transient,

    /// The service asked us to slow down (HTTP 429).
    RateLimited,

    /// Failure that will not succeed regardless of retries.
    Permanent,
}

impl FailureType {
    /// Returns `true` for failure types worth another attempt.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::RateLimited)
    }
}

/// Decision on whether to retry a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the call after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the call.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry and timeout settings for a single transport call.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `base_delay`: 1 second
/// - `attempt_timeout`: 30 seconds
///
/// # Delay Calculation
///
/// ```text
/// delay = base_delay * attempt
/// ```
///
/// With defaults, a call that keeps failing waits 1s, then 2s, then gives up.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay unit multiplied by the failed attempt number.
    base_delay: Duration,

    /// Hard timeout applied to each attempt.
    attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            attempt_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Maximum attempts including initial (clamped to >= 1)
    /// * `base_delay` - Linear backoff unit
    /// * `attempt_timeout` - Hard timeout per attempt
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            attempt_timeout,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Determines whether to retry a failed call.
    ///
    /// `attempt` is the 1-indexed attempt that just failed.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if !failure_type.is_retryable() {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = linear_backoff(self.base_delay, attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}

/// Linear backoff for single-call retries: `base * attempt`.
#[must_use]
pub fn linear_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

/// Exponential backoff for status polling: `interval * 2^(consecutive_errors - 1)`.
///
/// Zero errors means a healthy loop, which waits exactly one interval.
#[must_use]
pub fn poll_backoff(interval: Duration, consecutive_errors: u32) -> Duration {
    let exponent = consecutive_errors.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    interval.saturating_mul(1_u32 << exponent)
}

/// Classifies a transport error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout, connection failure | Transient |
/// | HTTP 408, 5xx | Transient |
/// | HTTP 429 | RateLimited |
/// | HTTP 404, other 4xx | Permanent |
/// | Network (TLS / certificate) | Permanent |
/// | Invalid URL, decode failure, cancellation | Permanent |
#[must_use]
pub fn classify_error(error: &TransportError) -> FailureType {
    match error {
        TransportError::HttpStatus { status, .. } => classify_http_status(*status),

        TransportError::Timeout { .. } | TransportError::Connection { .. } => {
            FailureType::Transient
        }

        TransportError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }

        TransportError::InvalidUrl { .. }
        | TransportError::Decode { .. }
        | TransportError::Cancelled { .. } => FailureType::Permanent,
    }
}

#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        404 => FailureType::Permanent,   // Not Found - unknown job, never retried
        408 => FailureType::Transient,   // Request Timeout
        429 => FailureType::RateLimited, // Too Many Requests
        status if (400..500).contains(&status) => FailureType::Permanent,
        status if (500..600).contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

// Only the source chain is inspected: the outer reqwest message embeds the
// request URL, whose host may itself contain "tls" or "ssl".
fn is_tls_error(error: &(dyn std::error::Error + 'static)) -> bool {
    std::iter::successors(error.source(), |e| e.source()).any(|cause| {
        let message = cause.to_string().to_lowercase();
        message.contains("certificate")
            || message.contains("tls")
            || message.contains("ssl")
            || message.contains("handshake")
    })
}
