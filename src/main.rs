//! CLI entry point for the exporter tool.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use exporter_core::{
    DownloadedArtifact, ExportEngine, ExportError, ExportRequest, JobHandle, JobStatus, Resolution,
};
use serde::Serialize;
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod output;
mod progress;

use app_config::VerbositySetting;
use cli::{Args, Command, SubmitArgs};
use output::OutputMode;
use progress::JobProgress;

/// Process exit status for each command outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    Failure,
    InvalidInput,
    Interrupted,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::InvalidInput => 2,
            Self::Interrupted => 130,
        }
    }

    fn from_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<ExportError>() {
            Some(ExportError::Validation(_)) => Self::InvalidInput,
            Some(ExportError::Cancelled { .. }) => Self::Interrupted,
            _ => Self::Failure,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Everything `submit` produced, for `--json` output.
#[derive(Debug, Serialize)]
struct SubmitOutcome {
    job: JobHandle,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<DownloadedArtifact>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ProcessExit::Success.into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ProcessExit::from_error(&err).into()
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let loaded = app_config::load_default_file_config()?;
    init_tracing(&args, loaded.verbosity());

    debug!(
        ?args,
        config_path = ?loaded.path,
        from_file = loaded.loaded_from_file(),
        "CLI arguments parsed"
    );

    let config = loaded.engine_config(&args)?;
    info!(base_url = %config.base_url, "Exporter starting");
    let engine = ExportEngine::new(config).context("Failed to initialise export engine")?;

    let mode = OutputMode::from_flag(args.json);
    let show_progress =
        progress::should_show_progress(io::stderr().is_terminal(), args.quiet, args.json);

    let result = dispatch(&engine, &args.command, mode, show_progress).await;

    debug!(
        summary = %output::metrics_summary(&engine.get_metrics()),
        "Request metrics"
    );
    engine.shutdown();
    result
}

async fn dispatch(
    engine: &ExportEngine,
    command: &Command,
    mode: OutputMode,
    show_progress: bool,
) -> Result<()> {
    match command {
        Command::Capabilities => {
            let caps = engine.get_capabilities().await;
            if caps.is_fallback() {
                warn!("Conversion Service unreachable, showing built-in capabilities");
            }
            emit(&mode.render(&caps, output::capabilities_text)?);
        }
        Command::Submit(submit) => {
            let outcome = run_submit(engine, submit, show_progress).await?;
            emit(&mode.render(&outcome, submit_text)?);
        }
        Command::Status { job_id } => {
            let status = wait_for_job(engine, job_id, show_progress).await?;
            emit(&mode.render(&status, output::status_text)?);
        }
        Command::Download { job_id, output } => {
            let artifact = engine.download_artifact(job_id, output.as_deref()).await?;
            emit(&mode.render(&artifact, output::artifact_text)?);
        }
        Command::History { limit } => {
            let entries = engine.history(*limit).await?;
            emit(&mode.render(entries.as_slice(), output::history_text)?);
        }
        Command::Stats => {
            let stats = engine.service_stats().await?;
            emit(&mode.render(&stats, output::stats_text)?);
        }
    }
    Ok(())
}

async fn run_submit(
    engine: &ExportEngine,
    args: &SubmitArgs,
    show_progress: bool,
) -> Result<SubmitOutcome> {
    let job = engine.submit_export(&build_request(args)).await?;
    info!(job_id = %job.job_id, "Export submitted");

    let mut outcome = SubmitOutcome {
        job,
        status: None,
        artifact: None,
    };
    if !args.should_wait() {
        return Ok(outcome);
    }

    let job_id = outcome.job.job_id.clone();
    let status = wait_for_job(engine, &job_id, show_progress)
        .await
        .with_context(|| format!("Job {job_id} was submitted but did not complete"))?;
    outcome.status = Some(status);

    if args.download {
        let artifact = engine
            .download_artifact(&job_id, args.output.as_deref())
            .await?;
        outcome.artifact = Some(artifact);
    }
    Ok(outcome)
}

fn build_request(args: &SubmitArgs) -> ExportRequest {
    let mut request = ExportRequest::new(args.source_url.clone(), args.format.clone())
        .with_quality(args.quality)
        .with_fps(args.fps)
        .with_duration(args.duration)
        .with_alpha_channel(args.alpha);
    if let (Some(width), Some(height)) = (args.width, args.height) {
        request = request.with_resolution(Resolution::new(width, height));
    }
    request
}

/// Polls `job_id` to a terminal state. Ctrl-C cancels the poll loop.
async fn wait_for_job(
    engine: &ExportEngine,
    job_id: &str,
    show_progress: bool,
) -> Result<JobStatus, ExportError> {
    let progress = JobProgress::new(job_id, show_progress);
    let poll = engine.poll_until_complete(job_id, |status| progress.observe(status));
    tokio::pin!(poll);

    let result = tokio::select! {
        result = &mut poll => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!(job_id, "Interrupt received, cancelling export polling");
            if engine.cancel(job_id) {
                poll.await
            } else {
                Err(ExportError::cancelled(job_id))
            }
        }
    };

    match &result {
        Ok(_) => progress.finish(),
        Err(err) => progress.abandon(&err.to_string()),
    }
    result
}

fn submit_text(outcome: &SubmitOutcome) -> String {
    let mut lines = vec![output::handle_text(&outcome.job)];
    if let Some(status) = &outcome.status {
        lines.push(output::status_text(status));
    }
    if let Some(artifact) = &outcome.artifact {
        lines.push(output::artifact_text(artifact));
    }
    lines.join("\n")
}

fn emit(rendered: &str) {
    println!("{}", rendered.trim_end());
}

/// Log level used unless `RUST_LOG` is set.
///
/// Priority: quiet flag > verbose flag > config file > default (info)
fn default_log_level(args: &Args, file_verbosity: Option<VerbositySetting>) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => file_verbosity.map_or("info", VerbositySetting::log_level),
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(args: &Args, file_verbosity: Option<VerbositySetting>) {
    let default_level = default_log_level(args, file_verbosity);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so `--json` output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use exporter_core::{ExportQuality, ValidationError};

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_log_level_precedence() {
        let plain = parse(&["exporter", "stats"]);
        assert_eq!(default_log_level(&plain, None), "info");
        assert_eq!(
            default_log_level(&plain, Some(VerbositySetting::Debug)),
            "trace"
        );

        let verbose = parse(&["exporter", "-v", "stats"]);
        assert_eq!(
            default_log_level(&verbose, Some(VerbositySetting::Quiet)),
            "debug"
        );

        let quiet = parse(&["exporter", "-q", "-vv", "stats"]);
        assert_eq!(
            default_log_level(&quiet, Some(VerbositySetting::Debug)),
            "error"
        );
    }

    #[test]
    fn test_process_exit_codes_from_errors() {
        let validation = anyhow::Error::new(ExportError::from(ValidationError::MissingSource));
        assert_eq!(ProcessExit::from_error(&validation), ProcessExit::InvalidInput);

        let cancelled = anyhow::Error::new(ExportError::cancelled("J1")).context("waiting");
        assert_eq!(ProcessExit::from_error(&cancelled), ProcessExit::Interrupted);

        let failed = anyhow::Error::new(ExportError::job_failed("J1", "codec"));
        assert_eq!(ProcessExit::from_error(&failed), ProcessExit::Failure);

        let other = anyhow::anyhow!("config broke");
        assert_eq!(ProcessExit::from_error(&other), ProcessExit::Failure);

        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Interrupted.code(), 130);
    }

    #[test]
    fn test_build_request_from_submit_args() {
        let args = parse(&[
            "exporter",
            "submit",
            "https://cdn/x.webm",
            "-f",
            "gif",
            "--quality",
            "low",
            "--width",
            "640",
            "--height",
            "480",
            "--fps",
            "12",
        ]);
        let Command::Submit(submit) = &args.command else {
            panic!("expected submit");
        };
        let request = build_request(submit);
        assert_eq!(request.format, "gif");
        assert_eq!(request.quality, ExportQuality::Low);
        assert_eq!(request.resolution, Resolution::new(640, 480));
        assert_eq!(request.fps, 12);
        assert!(!request.alpha_channel);
    }

    #[test]
    fn test_build_request_keeps_default_resolution() {
        let args = parse(&["exporter", "submit", "https://cdn/x.webm", "-f", "mp4"]);
        let Command::Submit(submit) = &args.command else {
            panic!("expected submit");
        };
        assert_eq!(build_request(submit).resolution, Resolution::default());
    }
}
