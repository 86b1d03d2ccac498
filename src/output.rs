//! Text and JSON rendering of command results.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use exporter_core::{
    CapabilitySet, DownloadedArtifact, ExportHistoryEntry, JobHandle, JobStatus, Metrics,
    ServiceStats,
};
use serde::Serialize;

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub(crate) fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }

    /// Renders `value` as pretty JSON or through `text`.
    pub(crate) fn render<T: Serialize + ?Sized>(
        self,
        value: &T,
        text: impl FnOnce(&T) -> String,
    ) -> Result<String> {
        match self {
            Self::Json => {
                serde_json::to_string_pretty(value).context("Failed to encode JSON output")
            }
            Self::Text => Ok(text(value)),
        }
    }
}

pub(crate) fn capabilities_text(caps: &CapabilitySet) -> String {
    let mut out = String::new();
    if caps.is_fallback() {
        out.push_str("(service unreachable, showing built-in defaults)\n");
    }
    for (key, cap) in &caps.formats {
        let qualities: Vec<&str> = cap.supported_qualities.iter().map(String::as_str).collect();
        let _ = writeln!(
            out,
            "{key:<12} {:<20} max {}x{}  alpha: {}  qualities: {}",
            cap.name,
            cap.max_resolution.0,
            cap.max_resolution.1,
            if cap.supports_alpha { "yes" } else { "no" },
            qualities.join(", ")
        );
    }
    out
}

pub(crate) fn handle_text(handle: &JobHandle) -> String {
    let mut out = format!("Submitted job {}", handle.job_id);
    if let Some(eta) = handle.estimated_time_seconds {
        let _ = write!(out, " (estimated {eta:.0}s)");
    }
    out
}

pub(crate) fn status_text(status: &JobStatus) -> String {
    let mut out = format!(
        "Job {}: {} ({}%)",
        status.job_id, status.status, status.progress
    );
    if let Some(url) = &status.download_url {
        let _ = write!(out, "\nDownload URL: {url}");
    }
    if let Some(error) = &status.error {
        let _ = write!(out, "\nError: {error}");
    }
    out
}

pub(crate) fn artifact_text(artifact: &DownloadedArtifact) -> String {
    format!(
        "Saved {} ({} bytes) to {}",
        artifact.filename,
        artifact.size_bytes,
        artifact.path.display()
    )
}

pub(crate) fn history_text(entries: &[ExportHistoryEntry]) -> String {
    if entries.is_empty() {
        return "No exports yet".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let size = entry
            .file_size_mb
            .map_or_else(|| "-".to_string(), |mb| format!("{mb:.2} MB"));
        let _ = writeln!(
            out,
            "{:<38} {:<10} {:<7} {:<10} {:<10} {}",
            entry.job_id,
            entry.format,
            entry.quality,
            entry.status.as_str(),
            size,
            entry.created_at
        );
    }
    out
}

pub(crate) fn stats_text(stats: &ServiceStats) -> String {
    let mut out = format!(
        "Total exports: {}\nAverage export time: {}\nTotal output: {:.3} GB\n",
        stats.total_exports, stats.avg_export_time, stats.total_output_size_gb
    );
    for (format, count) in &stats.exports_by_format {
        let _ = writeln!(out, "  {format:<12} {count}");
    }
    if !stats.formats.is_empty() {
        let _ = writeln!(out, "Available formats: {}", stats.formats.join(", "));
    }
    out
}

/// One-line request summary logged after each command.
pub(crate) fn metrics_summary(metrics: &Metrics) -> String {
    format!(
        "{} requests ({} ok, {} failed), avg latency {:.1} ms",
        metrics.total_requests,
        metrics.successful_requests,
        metrics.failed_requests,
        metrics.average_latency_ms
    )
}
