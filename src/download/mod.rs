//! Artifact download: fetch, name, save, and release.

mod filename;
mod manager;
mod sink;

pub use filename::{parse_content_disposition, resolve_filename, sanitize_filename};
pub use manager::{DownloadManager, DownloadedArtifact};
pub use sink::{ArtifactSink, DirectorySink};
