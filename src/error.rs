//! Caller-facing error type for engine operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::transport::TransportError;
use crate::validation::ValidationError;

/// Terminal outcome of a failed engine operation.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The request was rejected before any network activity.
    #[error("invalid export request: {0}")]
    Validation(#[from] ValidationError),

    /// A service call failed after its retry budget was spent.
    #[error(transparent)]
    Network(#[from] TransportError),

    /// The service does not know the job (HTTP 404).
    #[error("export job {job_id} not found")]
    JobNotFound {
        /// The unknown job.
        job_id: String,
    },

    /// The service reported the job as failed.
    #[error("export job {job_id} failed: {message}")]
    JobFailed {
        /// The failed job.
        job_id: String,
        /// Server-supplied failure message.
        message: String,
    },

    /// Status polling hit too many consecutive transient errors.
    #[error("gave up polling job {job_id} after {attempts} consecutive errors: {last_error}")]
    PollExhausted {
        /// The job being polled.
        job_id: String,
        /// Consecutive failures observed.
        attempts: u32,
        /// The final transient error.
        #[source]
        last_error: TransportError,
    },

    /// The operation was cancelled by the caller or by the service.
    #[error("export job {job_id} cancelled")]
    Cancelled {
        /// The cancelled job.
        job_id: String,
    },

    /// Writing the artifact to disk failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The destination that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    pub fn job_not_found(job_id: impl Into<String>) -> Self {
        Self::JobNotFound {
            job_id: job_id.into(),
        }
    }

    pub fn job_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JobFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(job_id: impl Into<String>) -> Self {
        Self::Cancelled {
            job_id: job_id.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for caller-initiated (or service-side) cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
