//! Transport layer between the engine and the Conversion Service.
//!
//! The [`Transport`] trait is the seam for a single request/response exchange.
//! [`HttpTransport`] implements it over reqwest; tests substitute scripted
//! implementations. [`ResilientTransport`] wraps any transport with a hard
//! per-attempt timeout, linear retry backoff, cancellation, and metrics.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use exporter_core::transport::{HttpTransport, ResilientTransport, RetryPolicy, ServiceRequest};
//! use exporter_core::{EngineConfig, MetricsCollector};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let http = HttpTransport::new(&config)?;
//! let transport = ResilientTransport::new(
//!     Arc::new(http),
//!     RetryPolicy::default(),
//!     Arc::new(MetricsCollector::new()),
//! );
//! let response = transport
//!     .call(&ServiceRequest::get("capabilities"), &CancellationToken::new())
//!     .await?;
//! println!("HTTP {}", response.status);
//! # Ok(())
//! # }
//! ```

mod error;
mod http;
mod resilient;
mod retry;
mod user_agent;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;

pub use error::TransportError;
pub use http::HttpTransport;
pub use resilient::ResilientTransport;
pub use retry::{
    FailureType, RetryDecision, RetryPolicy, classify_error, linear_backoff, poll_backoff,
};

/// HTTP methods used by the Conversion Service contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// A request to one service endpoint, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub method: Method,
    /// Endpoint path without a leading slash, e.g. `status/J1`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ServiceRequest {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn post_json(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Short label for logs and error context, e.g. `GET status/J1`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Builds `{endpoint}/{job_id}` with the job id percent-encoded as one path segment.
///
/// Returns `None` for ids that cannot name a job: empty, `.` or `..`, which URL
/// resolution would collapse into a different endpoint.
#[must_use]
pub fn job_path(endpoint: &str, job_id: &str) -> Option<String> {
    if matches!(job_id, "" | "." | "..") {
        return None;
    }
    Some(format!("{endpoint}/{}", urlencoding::encode(job_id)))
}

/// A successful (2xx) response from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    /// Raw `Content-Disposition` header, if any.
    pub content_disposition: Option<String>,
    /// Raw `Content-Type` header, if any.
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl ServiceResponse {
    /// Creates a 200 response with a JSON body.
    #[must_use]
    pub fn json_body(value: &serde_json::Value) -> Self {
        Self {
            status: 200,
            content_disposition: None,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(value.to_string()),
        }
    }

    /// Creates a 200 response with a binary body.
    #[must_use]
    pub fn binary(body: impl Into<Bytes>, content_disposition: Option<&str>) -> Self {
        Self {
            status: 200,
            content_disposition: content_disposition.map(str::to_string),
            content_type: Some("application/octet-stream".to_string()),
            body: body.into(),
        }
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::decode(url, e))
    }
}

/// One request/response exchange with the Conversion Service.
///
/// Implementations return `Ok` only for 2xx responses and map everything else
/// to a [`TransportError`]. They do not retry and do not apply timeouts of their
/// own beyond what the underlying client enforces; [`ResilientTransport`] does both.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn execute(&self, request: &ServiceRequest) -> Result<ServiceResponse, TransportError>;
}
