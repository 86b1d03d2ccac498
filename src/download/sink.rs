//! Destinations for downloaded artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::filename::resolve_unique_path;
use crate::error::ExportError;

/// The host's "save" action for a finished artifact.
///
/// `save` receives a cheap clone of the manager's buffer; the manager keeps its
/// own handle alive for the release delay after `save` starts.
#[async_trait]
pub trait ArtifactSink: Send + Sync + fmt::Debug {
    /// Persists `data` under (a sanitized form of) `filename` and returns where it went.
    async fn save(
        &self,
        job_id: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<PathBuf, ExportError>;
}

/// Writes artifacts into a directory, never overwriting existing files.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn save(
        &self,
        job_id: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ExportError::io(&self.dir, e))?;
        let path = resolve_unique_path(&self.dir, filename, &format!("export_{job_id}"));
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ExportError::io(&path, e))?;
        debug!(path = %path.display(), bytes = data.len(), "artifact written");
        Ok(path)
    }
}
