//! Timeout, retry, cancellation and metrics around any [`Transport`].

use std::sync::Arc;

use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::{ServiceRequest, ServiceResponse, Transport, TransportError};
use crate::metrics::MetricsCollector;

/// Wraps a [`Transport`] with the engine's call discipline.
///
/// Every attempt is bounded by the policy's hard timeout and aborted as soon
/// as the caller's token fires. [`call`](Self::call) retries retryable
/// failures with linear backoff; [`call_once`](Self::call_once) makes exactly
/// one attempt for callers that run their own retry schedule.
#[derive(Debug, Clone)]
pub struct ResilientTransport {
    inner: Arc<dyn Transport>,
    policy: RetryPolicy,
    metrics: Arc<MetricsCollector>,
}

impl ResilientTransport {
    #[must_use]
    pub fn new(
        inner: Arc<dyn Transport>,
        policy: RetryPolicy,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            inner,
            policy,
            metrics,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Performs `request`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error once the policy gives up, or
    /// [`TransportError::Cancelled`] if `cancel` fires first.
    #[instrument(level = "debug", skip(self, request, cancel), fields(request = %request.label()))]
    pub async fn call(
        &self,
        request: &ServiceRequest,
        cancel: &CancellationToken,
    ) -> Result<ServiceResponse, TransportError> {
        let mut attempt = 1;
        loop {
            // Latency covers the successful attempt only, not earlier failures or backoff.
            let started = Instant::now();
            let error = match self.attempt(request, cancel).await {
                Ok(response) => {
                    self.metrics.record_success(started.elapsed());
                    return Ok(response);
                }
                Err(error) => error,
            };

            match self.policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "request failed, retrying"
                    );
                    tokio::select! {
                        () = cancel.cancelled() => {
                            self.metrics.record_failure();
                            return Err(TransportError::cancelled(request.label()));
                        }
                        () = sleep(delay) => {}
                    }
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(attempt, %reason, error = %error, "giving up");
                    self.metrics.record_failure();
                    return Err(error);
                }
            }
        }
    }

    /// Performs `request` with a single attempt.
    ///
    /// # Errors
    ///
    /// Returns the attempt's error, a timeout, or [`TransportError::Cancelled`].
    pub async fn call_once(
        &self,
        request: &ServiceRequest,
        cancel: &CancellationToken,
    ) -> Result<ServiceResponse, TransportError> {
        let started = Instant::now();
        let result = self.attempt(request, cancel).await;
        match &result {
            Ok(_) => self.metrics.record_success(started.elapsed()),
            Err(_) => self.metrics.record_failure(),
        }
        result
    }

    async fn attempt(
        &self,
        request: &ServiceRequest,
        cancel: &CancellationToken,
    ) -> Result<ServiceResponse, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::cancelled(request.label()));
        }
        self.metrics.record_attempt();
        tokio::select! {
            () = cancel.cancelled() => Err(TransportError::cancelled(request.label())),
            outcome = timeout(self.policy.attempt_timeout(), self.inner.execute(request)) => {
                outcome.unwrap_or_else(|_| Err(TransportError::timeout(request.label())))
            }
        }
    }
}
