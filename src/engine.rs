//! The engine facade: one object owning every component and the shutdown token.
//!
//! # Example
//!
//! ```no_run
//! use exporter_core::{EngineConfig, ExportEngine, ExportQuality, ExportRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ExportEngine::new(EngineConfig::new("http://localhost:8001/api/export")?)?;
//!
//! let request = ExportRequest::new("https://cdn.example.com/scene.glb", "mp4")
//!     .with_quality(ExportQuality::High);
//! let handle = engine.submit_export(&request).await?;
//!
//! let status = engine
//!     .poll_until_complete(&handle.job_id, |s| println!("{}%", s.progress))
//!     .await?;
//! println!("ready at {:?}", status.download_url);
//!
//! let artifact = engine.download_artifact(&handle.job_id, None).await?;
//! println!("saved to {}", artifact.path.display());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::capabilities::CapabilitiesCache;
use crate::config::{ConfigError, EngineConfig};
use crate::constants::{HISTORY_PATH, STATS_PATH};
use crate::download::{ArtifactSink, DirectorySink, DownloadManager, DownloadedArtifact};
use crate::error::ExportError;
use crate::metrics::{Metrics, MetricsCollector};
use crate::model::{
    CapabilitySet, ExportHistoryEntry, ExportRequest, HistoryResponse, JobHandle, JobStatus,
    ServiceStats, StatsResponse,
};
use crate::poll::{JobPoller, PollRegistry};
use crate::submit::JobSubmitter;
use crate::transport::{HttpTransport, ResilientTransport, ServiceRequest, Transport};

/// Client-side engine for the Conversion Service.
///
/// All state (cache, registry, metrics) belongs to the instance. Dropping the
/// engine, or calling [`shutdown`](Self::shutdown), cancels every poll loop and
/// in-flight request it started.
#[derive(Debug)]
pub struct ExportEngine {
    config: EngineConfig,
    metrics: Arc<MetricsCollector>,
    transport: ResilientTransport,
    capabilities: CapabilitiesCache,
    submitter: JobSubmitter,
    registry: Arc<PollRegistry>,
    poller: JobPoller,
    downloads: DownloadManager,
    shutdown: CancellationToken,
}

impl ExportEngine {
    /// Builds an engine that talks HTTP and saves into `config.output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid settings or if the HTTP client cannot be built.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        let sink = Arc::new(DirectorySink::new(config.output_dir.clone()));
        Ok(Self::with_parts(config, transport, sink))
    }

    /// Builds an engine over a caller-supplied transport and sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid settings.
    pub fn with_transport(
        config: EngineConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_parts(config, transport, sink))
    }

    fn with_parts(
        config: EngineConfig,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new());
        let shutdown = CancellationToken::new();
        let transport =
            ResilientTransport::new(transport, config.retry_policy(), Arc::clone(&metrics));
        let registry = Arc::new(PollRegistry::new(shutdown.clone()));

        debug!(base_url = %config.base_url, "export engine created");
        Self {
            capabilities: CapabilitiesCache::new(transport.clone(), config.capabilities_ttl),
            submitter: JobSubmitter::new(transport.clone()),
            poller: JobPoller::new(
                transport.clone(),
                Arc::clone(&registry),
                config.poll_interval,
                config.poll_max_errors,
            ),
            downloads: DownloadManager::new(
                transport.clone(),
                sink,
                config.download_release_delay,
            ),
            transport,
            registry,
            metrics,
            shutdown,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current format capabilities; never fails (see [`CapabilitySet::is_fallback`]).
    pub async fn get_capabilities(&self) -> CapabilitySet {
        self.capabilities.get_capabilities(&self.shutdown).await
    }

    pub async fn invalidate_capabilities(&self) {
        self.capabilities.invalidate().await;
    }

    /// Validates and submits an export request.
    ///
    /// # Errors
    ///
    /// [`ExportError::Validation`] without any network call, or
    /// [`ExportError::Network`] once the transport gives up.
    pub async fn submit_export(&self, request: &ExportRequest) -> Result<JobHandle, ExportError> {
        self.submitter.submit(request, &self.shutdown).await
    }

    /// Polls `job_id` until it is terminal, reporting progress along the way.
    ///
    /// # Errors
    ///
    /// [`ExportError::JobFailed`], [`ExportError::JobNotFound`],
    /// [`ExportError::PollExhausted`], [`ExportError::Cancelled`], or
    /// [`ExportError::Network`] for a non-retryable failure.
    pub async fn poll_until_complete<F>(
        &self,
        job_id: &str,
        on_progress: F,
    ) -> Result<JobStatus, ExportError>
    where
        F: FnMut(&JobStatus) + Send,
    {
        self.poller.poll_until_complete(job_id, on_progress).await
    }

    /// Stops polling `job_id`. Returns `false` if no loop was active.
    pub fn cancel(&self, job_id: &str) -> bool {
        let cancelled = self.registry.cancel(job_id);
        if cancelled {
            info!(job_id, "export polling cancelled");
        }
        cancelled
    }

    /// Downloads a finished artifact into the engine's sink.
    ///
    /// # Errors
    ///
    /// See [`DownloadManager::download_artifact`].
    pub async fn download_artifact(
        &self,
        job_id: &str,
        filename: Option<&str>,
    ) -> Result<DownloadedArtifact, ExportError> {
        self.downloads
            .download_artifact(job_id, filename, &self.shutdown)
            .await
    }

    /// Metrics snapshot, including the number of active poll loops.
    #[must_use]
    pub fn get_metrics(&self) -> Metrics {
        Metrics {
            active_polls: self.registry.len(),
            ..self.metrics.snapshot()
        }
    }

    /// Most recent exports known to the service, newest first.
    ///
    /// # Errors
    ///
    /// [`ExportError::Network`] once the transport gives up.
    pub async fn history(&self, limit: u32) -> Result<Vec<ExportHistoryEntry>, ExportError> {
        let request = ServiceRequest::get(HISTORY_PATH).with_query("limit", limit);
        let response = self.transport.call(&request, &self.shutdown).await?;
        let body: HistoryResponse = response.json(&request.label())?;
        Ok(body.exports)
    }

    /// Service-wide export statistics.
    ///
    /// # Errors
    ///
    /// [`ExportError::Network`] once the transport gives up.
    pub async fn service_stats(&self) -> Result<ServiceStats, ExportError> {
        let request = ServiceRequest::get(STATS_PATH);
        let response = self.transport.call(&request, &self.shutdown).await?;
        let body: StatsResponse = response.json(&request.label())?;
        Ok(body.stats)
    }

    /// Job ids currently being polled, sorted.
    #[must_use]
    pub fn active_jobs(&self) -> Vec<String> {
        self.registry.job_ids()
    }

    /// Cancels every poll loop and in-flight request. Later calls fail fast.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            let cleared = self.registry.clear_all();
            self.shutdown.cancel();
            info!(cleared, "export engine shut down");
        }
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    #[must_use]
    pub fn pending_releases(&self) -> usize {
        self.downloads.pending_releases()
    }
}

impl Drop for ExportEngine {
    fn drop(&mut self) {
        self.registry.clear_all();
        self.shutdown.cancel();
    }
}
