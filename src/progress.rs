//! Progress bar for jobs being polled.

use std::time::Duration;

use exporter_core::{JobState, JobStatus};
use indicatif::{ProgressBar, ProgressStyle};

/// Renders poll observations as a percentage bar on stderr.
///
/// A disabled instance accepts the same calls and draws nothing, so callers do
/// not branch on whether output is interactive.
#[derive(Debug)]
pub(crate) struct JobProgress {
    bar: Option<ProgressBar>,
}

impl JobProgress {
    pub(crate) fn new(job_id: &str, enabled: bool) -> Self {
        if !enabled {
            return Self { bar: None };
        }
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner} {prefix} [{bar:30}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix(job_id.to_string());
        bar.set_message(JobState::Pending.as_str());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    /// Poll observer: moves the bar to the reported progress.
    pub(crate) fn observe(&self, status: &JobStatus) {
        if let Some(bar) = &self.bar {
            bar.set_position(u64::from(status.progress.min(100)));
            bar.set_message(status.status.as_str());
        }
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    pub(crate) fn abandon(&self, reason: &str) {
        if let Some(bar) = &self.bar {
            bar.abandon_with_message(reason.to_string());
        }
    }
}

impl Drop for JobProgress {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar
            && !bar.is_finished()
        {
            bar.finish_and_clear();
        }
    }
}

/// Whether a progress bar should be drawn for this invocation.
pub(crate) fn should_show_progress(stderr_is_terminal: bool, quiet: bool, json: bool) -> bool {
    stderr_is_terminal && !quiet && !json
}
