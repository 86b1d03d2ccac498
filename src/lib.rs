//! Exporter Core Library
//!
//! Client-side engine for a remote media Conversion Service: discover format
//! capabilities, validate and submit export jobs, poll them to completion,
//! and retrieve the finished artifacts.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`validation`] - Pure request checks, run before any network access
//! - [`transport`] - HTTP transport, retry classification, timeouts and cancellation
//! - [`capabilities`] - TTL cache over the service's format capabilities
//! - [`submit`] - Job submission
//! - [`poll`] - Per-job status polling and the registry of live poll loops
//! - [`download`] - Artifact retrieval and saving
//! - [`metrics`] - Request counters and latency
//! - [`engine`] - The [`ExportEngine`] facade tying it all together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capabilities;
pub mod config;
pub mod constants;
pub mod download;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod model;
pub mod poll;
pub mod submit;
pub mod transport;
pub mod validation;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use capabilities::CapabilitiesCache;
pub use config::{ConfigError, EngineConfig};
pub use download::{ArtifactSink, DirectorySink, DownloadManager, DownloadedArtifact};
pub use engine::ExportEngine;
pub use error::ExportError;
pub use metrics::{Metrics, MetricsCollector};
pub use model::{
    CapabilitySet, CapabilitySource, ExportFormat, ExportHistoryEntry, ExportQuality,
    ExportRequest, FormatCapability, JobHandle, JobState, JobStatus, Resolution, ServiceStats,
};
pub use poll::{JobPoller, PollRegistry};
pub use submit::JobSubmitter;
pub use transport::{
    FailureType, HttpTransport, ResilientTransport, RetryPolicy, ServiceRequest,
    ServiceResponse, Transport, TransportError, classify_error,
};
pub use validation::{ValidationError, validate};
