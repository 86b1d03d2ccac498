//! Job handles, status snapshots, and history entries returned by the service.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Handle for a job accepted by the Conversion Service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobHandle {
    /// Opaque identifier issued by the service.
    pub job_id: String,
    /// Service estimate of processing time, when provided.
    pub estimated_time_seconds: Option<f64>,
    /// Local time the submission was accepted.
    pub created_at: DateTime<Utc>,
    /// Human-readable acknowledgement from the service.
    pub message: Option<String>,
}

/// Response body of `POST /convert`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubmitResponse {
    pub job_id: String,
    #[serde(default)]
    pub estimated_time_seconds: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Lifecycle state of a job as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Complete,
    Failed,
    Cancelled,
}

impl JobState {
    /// Returns `true` for states after which no further transitions occur.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status observation for a job (`GET /status/{job_id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub status: JobState,
    /// Completion percentage, 0-100.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Present once the job is terminal.
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Present once the job is complete.
    #[serde(default)]
    pub download_url: Option<String>,
    /// Present when the job failed.
    #[serde(default)]
    pub error: Option<String>,
    /// Free-form result metadata (file size, export time, ...).
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One row of `GET /history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportHistoryEntry {
    pub job_id: String,
    pub format: String,
    pub quality: String,
    pub status: JobState,
    pub created_at: String,
    #[serde(default)]
    pub file_size_mb: Option<f64>,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub exports: Vec<ExportHistoryEntry>,
}

/// Service-wide export statistics (`GET /stats`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceStats {
    pub total_exports: u64,
    pub exports_by_format: BTreeMap<String, u64>,
    pub total_export_time: f64,
    pub total_output_size_gb: f64,
    pub available_formats: u32,
    pub avg_export_time: String,
    pub formats: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsResponse {
    #[serde(default)]
    pub stats: ServiceStats,
}
