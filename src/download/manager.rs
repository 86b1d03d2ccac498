//! Artifact retrieval with a delayed release of the temporary buffer.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::filename::resolve_filename;
use super::sink::ArtifactSink;
use crate::constants::DOWNLOAD_PATH;
use crate::error::ExportError;
use crate::transport::{ResilientTransport, ServiceRequest, TransportError, job_path};

/// Where a downloaded artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedArtifact {
    pub job_id: String,
    /// Filename chosen before sanitization.
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DownloadManager {
    transport: ResilientTransport,
    sink: Arc<dyn ArtifactSink>,
    release_delay: Duration,
    pending_releases: Arc<AtomicUsize>,
}

impl DownloadManager {
    #[must_use]
    pub fn new(
        transport: ResilientTransport,
        sink: Arc<dyn ArtifactSink>,
        release_delay: Duration,
    ) -> Self {
        Self {
            transport,
            sink,
            release_delay,
            pending_releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Temporary buffers still waiting for their release delay to pass.
    #[must_use]
    pub fn pending_releases(&self) -> usize {
        self.pending_releases.load(Ordering::SeqCst)
    }

    /// Fetches the artifact for `job_id` and hands it to the sink.
    ///
    /// # Errors
    ///
    /// [`ExportError::JobNotFound`] on 404, [`ExportError::Cancelled`] when
    /// `cancel` fires, [`ExportError::Network`] for other transport failures
    /// (including 400 for a job that is not finished), and whatever the sink reports.
    #[instrument(skip(self, cancel))]
    pub async fn download_artifact(
        &self,
        job_id: &str,
        filename: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<DownloadedArtifact, ExportError> {
        let endpoint =
            job_path(DOWNLOAD_PATH, job_id).ok_or_else(|| ExportError::job_not_found(job_id))?;
        let request = ServiceRequest::get(endpoint);
        let response = self
            .transport
            .call(&request, cancel)
            .await
            .map_err(|e| map_download_error(job_id, e))?;

        let filename = resolve_filename(filename, response.content_disposition.as_deref(), job_id);
        let buffer = response.body;
        let size_bytes = buffer.len();
        debug!(%filename, size_bytes, "artifact received");

        let save = self.sink.save(job_id, &filename, buffer.clone());
        self.schedule_release(buffer);
        let path = save.await?;

        info!(path = %path.display(), size_bytes, "artifact saved");
        Ok(DownloadedArtifact {
            job_id: job_id.to_string(),
            filename,
            path,
            size_bytes,
        })
    }

    // Holds the buffer for `release_delay` so the save action starts before it is dropped.
    fn schedule_release(&self, buffer: Bytes) {
        let delay = self.release_delay;
        let pending = Arc::clone(&self.pending_releases);
        pending.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            drop(buffer);
            pending.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

fn map_download_error(job_id: &str, error: TransportError) -> ExportError {
    if error.is_not_found() {
        ExportError::job_not_found(job_id)
    } else if error.is_cancelled() {
        ExportError::cancelled(job_id)
    } else {
        ExportError::Network(error)
    }
}
