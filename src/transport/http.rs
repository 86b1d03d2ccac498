//! reqwest-backed [`Transport`] implementation.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::user_agent::default_user_agent;
use super::{Method, ServiceRequest, ServiceResponse, Transport, TransportError};
use crate::config::{ConfigError, EngineConfig};

/// HTTP transport for the Conversion Service.
///
/// Designed to be created once per engine and reused for every call, taking
/// advantage of reqwest's connection pooling.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

/// Error body FastAPI-style services return with non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

impl HttpTransport {
    /// Builds a transport for the config's base URL and timeouts.
    ///
    /// The reqwest client's own overall timeout is the per-attempt request
    /// timeout, so a hung connection is torn down even without the engine's
    /// outer timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if reqwest fails to build the client.
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .gzip(true)
            .user_agent(default_user_agent())
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Returns the base URL endpoint paths are joined onto.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, request: &ServiceRequest) -> Result<Url, TransportError> {
        let path = request.path.trim_start_matches('/');
        let mut url = self
            .base_url
            .join(path)
            .map_err(|_| TransportError::invalid_url(format!("{}{path}", self.base_url)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "debug", skip(self, request), fields(request = %request.label()))]
    async fn execute(&self, request: &ServiceRequest) -> Result<ServiceResponse, TransportError> {
        let url = self.endpoint_url(request)?;
        let url_str = url.to_string();

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::timeout(&url_str)
            } else {
                TransportError::network(&url_str, e)
            }
        })?;

        let status = response.status().as_u16();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_disposition = header(CONTENT_DISPOSITION);
        let content_type = header(CONTENT_TYPE);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::timeout(&url_str)
            } else {
                TransportError::network(&url_str, e)
            }
        })?;

        if !(200..300).contains(&status) {
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .map(|b| b.detail);
            debug!(status, ?detail, "service returned error status");
            return Err(TransportError::http_status_with_detail(
                url_str, status, detail,
            ));
        }

        debug!(status, bytes = body.len(), "service response received");
        Ok(ServiceResponse {
            status,
            content_disposition,
            content_type,
            body,
        })
    }
}
