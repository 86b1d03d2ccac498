//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand};

use exporter_core::ExportQuality;
use exporter_core::constants::DEFAULT_HISTORY_LIMIT;

/// Submit, track and retrieve media export jobs.
///
/// Talks to a Conversion Service that turns a source video into MP4, GIF or
/// WebM-with-alpha artifacts asynchronously.
#[derive(Parser, Debug)]
#[command(name = "exporter")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Conversion Service base URL (overrides config file)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory downloaded artifacts are written to (overrides config file)
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<std::path::PathBuf>,

    /// Per-request timeout in seconds (1-3600)
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Maximum attempts per request (1-10)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the formats, qualities and limits the service supports
    Capabilities,

    /// Submit a new export job
    Submit(SubmitArgs),

    /// Wait for a job to finish, showing its progress
    Status {
        /// Job identifier returned by `submit`
        job_id: String,
    },

    /// Download the artifact of a completed job
    Download {
        /// Job identifier returned by `submit`
        job_id: String,

        /// Filename to save the artifact under
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List recent exports known to the service
    History {
        /// Number of entries to show (1-100)
        #[arg(short = 'n', long, default_value_t = DEFAULT_HISTORY_LIMIT, value_parser = clap::value_parser!(u32).range(1..=100))]
        limit: u32,
    },

    /// Show service-wide export statistics
    Stats,
}

#[derive(clap::Args, Debug)]
pub struct SubmitArgs {
    /// URL of the source video
    pub source_url: String,

    /// Output format: mp4, gif or webm_alpha
    #[arg(short, long)]
    pub format: String,

    /// Quality preset: low, medium, high or ultra
    #[arg(long, default_value_t = ExportQuality::Medium)]
    pub quality: ExportQuality,

    /// Output width in pixels
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Output height in pixels
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Clip duration in seconds
    #[arg(long, default_value_t = 15.0)]
    pub duration: f64,

    /// Keep the alpha channel (webm_alpha only)
    #[arg(long)]
    pub alpha: bool,

    /// Wait for the job to finish
    #[arg(long)]
    pub wait: bool,

    /// Download the artifact once the job completes (implies --wait)
    #[arg(long)]
    pub download: bool,

    /// Filename for the downloaded artifact
    #[arg(short, long, requires = "download")]
    pub output: Option<String>,
}

impl SubmitArgs {
    /// Whether the command should poll after submitting.
    #[must_use]
    pub fn should_wait(&self) -> bool {
        self.wait || self.download
    }
}
