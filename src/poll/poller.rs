//! Per-job status polling loop.
//!
//! One call to [`JobPoller::poll_until_complete`] drives one job from its first
//! observed state to a terminal outcome:
//!
//! | Observation | Next step |
//! |-------------|-----------|
//! | `pending` / `processing` | reset error count, report progress, wait `interval` |
//! | `complete` | return the status |
//! | `failed` | [`ExportError::JobFailed`] with the service's message |
//! | `cancelled` (service side) | [`ExportError::Cancelled`] |
//! | HTTP 404 | [`ExportError::JobNotFound`], no retry |
//! | transient error | wait [`poll_backoff`], or [`ExportError::PollExhausted`] at `max_errors` |
//! | other error | [`ExportError::Network`] |
//! | token cancelled | [`ExportError::Cancelled`] |

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use super::registry::PollRegistry;
use crate::constants::STATUS_PATH;
use crate::error::ExportError;
use crate::model::{JobState, JobStatus};
use crate::transport::{
    FailureType, ResilientTransport, ServiceRequest, TransportError, classify_error, job_path,
    poll_backoff,
};

#[derive(Debug, Clone)]
pub struct JobPoller {
    transport: ResilientTransport,
    registry: Arc<PollRegistry>,
    interval: Duration,
    max_errors: u32,
}

/// What the loop does after one status request.
enum Tick {
    Wait(Duration),
    Done(Result<JobStatus, ExportError>),
}

impl JobPoller {
    #[must_use]
    pub fn new(
        transport: ResilientTransport,
        registry: Arc<PollRegistry>,
        interval: Duration,
        max_errors: u32,
    ) -> Self {
        Self {
            transport,
            registry,
            interval,
            max_errors: max_errors.max(1),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PollRegistry> {
        &self.registry
    }

    /// Polls `job_id` until it reaches a terminal state.
    ///
    /// `on_progress` sees every non-terminal status, with progress clamped so it
    /// never decreases. Any loop already polling `job_id` is cancelled first.
    ///
    /// # Errors
    ///
    /// See the module table; every non-`complete` outcome is an error.
    #[instrument(skip(self, on_progress), fields(interval_ms = self.interval.as_millis()))]
    pub async fn poll_until_complete<F>(
        &self,
        job_id: &str,
        mut on_progress: F,
    ) -> Result<JobStatus, ExportError>
    where
        F: FnMut(&JobStatus) + Send,
    {
        let path =
            job_path(STATUS_PATH, job_id).ok_or_else(|| ExportError::job_not_found(job_id))?;
        let request = ServiceRequest::get(path);
        let lease = self.registry.register(job_id);
        let token = lease.token().clone();

        let mut consecutive_errors: u32 = 0;
        let mut last_progress: u8 = 0;

        loop {
            if token.is_cancelled() {
                debug!("poll loop observed cancellation");
                return Err(ExportError::cancelled(job_id));
            }

            let tick = match self.transport.call_once(&request, &token).await {
                Ok(response) => match response.json::<JobStatus>(&request.label()) {
                    Ok(mut status) => {
                        status.progress = status.progress.clamp(last_progress, 100);
                        last_progress = status.progress;
                        self.on_status(job_id, status, &mut consecutive_errors, &mut on_progress)
                    }
                    Err(decode) => Tick::Done(Err(decode.into())),
                },
                Err(error) => self.on_error(job_id, error, &mut consecutive_errors),
            };

            let delay = match tick {
                Tick::Wait(delay) => delay,
                Tick::Done(outcome) => return outcome,
            };

            tokio::select! {
                () = token.cancelled() => {
                    debug!("poll loop cancelled while waiting");
                    return Err(ExportError::cancelled(job_id));
                }
                () = sleep(delay) => {}
            }
        }
    }

    fn on_status<F>(
        &self,
        job_id: &str,
        status: JobStatus,
        consecutive_errors: &mut u32,
        on_progress: &mut F,
    ) -> Tick
    where
        F: FnMut(&JobStatus),
    {
        match status.status {
            JobState::Pending | JobState::Processing => {
                *consecutive_errors = 0;
                debug!(state = %status.status, progress = status.progress, "job in progress");
                on_progress(&status);
                Tick::Wait(self.interval)
            }
            JobState::Complete => {
                info!(download_url = ?status.download_url, "export job complete");
                Tick::Done(Ok(status))
            }
            JobState::Failed => {
                let message = status
                    .error
                    .unwrap_or_else(|| "export failed without a message".to_string());
                warn!(%message, "export job failed");
                Tick::Done(Err(ExportError::job_failed(job_id, message)))
            }
            JobState::Cancelled => {
                info!("export job cancelled by the service");
                Tick::Done(Err(ExportError::cancelled(job_id)))
            }
        }
    }

    fn on_error(&self, job_id: &str, error: TransportError, consecutive_errors: &mut u32) -> Tick {
        if error.is_cancelled() {
            return Tick::Done(Err(ExportError::cancelled(job_id)));
        }
        if error.is_not_found() {
            warn!("status endpoint reports unknown job");
            return Tick::Done(Err(ExportError::job_not_found(job_id)));
        }
        if classify_error(&error) == FailureType::Permanent {
            return Tick::Done(Err(ExportError::Network(error)));
        }

        *consecutive_errors += 1;
        if *consecutive_errors >= self.max_errors {
            warn!(attempts = *consecutive_errors, error = %error, "poll retries exhausted");
            return Tick::Done(Err(ExportError::PollExhausted {
                job_id: job_id.to_string(),
                attempts: *consecutive_errors,
                last_error: error,
            }));
        }

        let delay = poll_backoff(self.interval, *consecutive_errors);
        warn!(
            consecutive_errors = *consecutive_errors,
            delay_ms = delay.as_millis(),
            error = %error,
            "status poll failed, backing off"
        );
        Tick::Wait(delay)
    }
}
