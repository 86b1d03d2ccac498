//! Error types for the transport layer.
//!
//! A [`TransportError`] is the "network error" surfaced to callers once the
//! retry budget of a call has been spent.

use thiserror::Error;

/// Errors that can occur while talking to the Conversion Service.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error reported by the HTTP client (DNS, refused connection, TLS, ...).
    #[error("network error calling {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Connection failure reported by a non-reqwest transport.
    #[error("connection failed calling {url}: {message}")]
    Connection {
        /// The URL that failed.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// The attempt did not finish within the hard timeout.
    #[error("timeout calling {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The service answered with a non-success status.
    #[error("HTTP {status} calling {url}{}", detail_suffix(.detail))]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The service's `detail` message, when the body carried one.
        detail: Option<String>,
    },

    /// The endpoint URL could not be built.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The response body did not match the expected shape.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        /// The URL whose response failed to decode.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The call was aborted by its cancellation token.
    #[error("request to {url} cancelled")]
    Cancelled {
        /// The URL whose request was aborted.
        url: String,
    },
}

impl TransportError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a connection error with a plain message.
    pub fn connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error without a detail message.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            detail: None,
        }
    }

    /// Creates an HTTP status error carrying the service's detail message.
    pub fn http_status_with_detail(
        url: impl Into<String>,
        status: u16,
        detail: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            detail,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns the HTTP status for [`TransportError::HttpStatus`].
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` when the service answered 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` for [`TransportError::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

// No `From<reqwest::Error>`: every variant needs the URL, which the source
// error does not reliably carry. Use the constructor helpers instead.
