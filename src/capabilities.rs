//! Time-boxed cache of the service's format capabilities.
//!
//! A fetch failure never reaches the caller: the cache substitutes
//! [`CapabilitySet::fallback`], stamps it with the current time, and serves it
//! for a full TTL so a dead service is not hammered on every access. Callers
//! that care can check [`CapabilitySet::is_fallback`].

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::CAPABILITIES_PATH;
use crate::model::{CapabilitiesResponse, CapabilitySet};
use crate::transport::{ResilientTransport, ServiceRequest, TransportError};

#[derive(Debug)]
pub struct CapabilitiesCache {
    transport: ResilientTransport,
    ttl: Duration,
    // Held across the fetch so concurrent callers share one request.
    cached: Mutex<Option<CapabilitySet>>,
}

impl CapabilitiesCache {
    #[must_use]
    pub fn new(transport: ResilientTransport, ttl: Duration) -> Self {
        Self {
            transport,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached set while it is fresh, otherwise refetches.
    ///
    /// If `cancel` fires mid-fetch the fallback set is returned but not cached.
    pub async fn get_capabilities(&self, cancel: &CancellationToken) -> CapabilitySet {
        let mut cached = self.cached.lock().await;
        if let Some(set) = cached.as_ref() {
            let age = Instant::now().saturating_duration_since(set.fetched_at);
            if age < self.ttl {
                debug!(age_ms = age.as_millis(), "capabilities cache hit");
                return set.clone();
            }
            debug!("capabilities cache expired");
        }

        match self.fetch(cancel).await {
            Ok(set) => {
                info!(formats = set.formats.len(), "fetched export capabilities");
                *cached = Some(set.clone());
                set
            }
            Err(error) if error.is_cancelled() => CapabilitySet::fallback(Instant::now()),
            Err(error) => {
                warn!(error = %error, "capability fetch failed, using fallback set");
                let set = CapabilitySet::fallback(Instant::now());
                *cached = Some(set.clone());
                set
            }
        }
    }

    /// Drops the cached set; the next access refetches.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<CapabilitySet, TransportError> {
        let request = ServiceRequest::get(CAPABILITIES_PATH);
        let response = self.transport.call(&request, cancel).await?;
        let body: CapabilitiesResponse = response.json(&request.label())?;
        Ok(CapabilitySet::live(body.formats, Instant::now()))
    }
}
