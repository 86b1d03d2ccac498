//! Format capability metadata published by the Conversion Service.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::request::{ExportFormat, ExportQuality};

/// Limits and options of a single export format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCapability {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "qualities")]
    pub supported_qualities: BTreeSet<String>,
    /// Largest accepted output size as `(width, height)`.
    pub max_resolution: (u32, u32),
    #[serde(default)]
    pub supports_alpha: bool,
}

/// Where a [`CapabilitySet`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilitySource {
    /// Fetched from the service.
    Live,
    /// Static defaults substituted after a failed fetch.
    Fallback,
}

/// Capabilities for every format, stamped with the time they were obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilitySet {
    pub formats: BTreeMap<String, FormatCapability>,
    #[serde(skip)]
    pub fetched_at: Instant,
    pub source: CapabilitySource,
}

/// Response body of `GET /capabilities`.
#[derive(Debug, Deserialize)]
pub(crate) struct CapabilitiesResponse {
    pub formats: BTreeMap<String, FormatCapability>,
}

impl CapabilitySet {
    pub(crate) fn live(formats: BTreeMap<String, FormatCapability>, fetched_at: Instant) -> Self {
        Self {
            formats,
            fetched_at,
            source: CapabilitySource::Live,
        }
    }

    /// Builds the static set used when the service cannot be reached.
    #[must_use]
    pub fn fallback(fetched_at: Instant) -> Self {
        let all = [
            ExportQuality::Low,
            ExportQuality::Medium,
            ExportQuality::High,
            ExportQuality::Ultra,
        ];
        let formats = BTreeMap::from([
            (
                ExportFormat::Mp4.as_str().to_string(),
                static_capability("MP4 Exporter", &all, (3840, 2160), false),
            ),
            (
                ExportFormat::Gif.as_str().to_string(),
                static_capability("GIF Exporter", &all[..3], (640, 640), false),
            ),
            (
                ExportFormat::WebmAlpha.as_str().to_string(),
                static_capability("WebM Alpha Exporter", &all[1..], (3840, 2160), true),
            ),
        ]);
        Self {
            formats,
            fetched_at,
            source: CapabilitySource::Fallback,
        }
    }

    /// Returns `true` when this set is the static substitute, not live data.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == CapabilitySource::Fallback
    }

    #[must_use]
    pub fn format(&self, format: ExportFormat) -> Option<&FormatCapability> {
        self.formats.get(format.as_str())
    }

    /// Returns whether `format` accepts the `quality` preset.
    #[must_use]
    pub fn supports_quality(&self, format: ExportFormat, quality: ExportQuality) -> bool {
        self.format(format)
            .is_some_and(|cap| cap.supported_qualities.contains(quality.as_str()))
    }
}

fn static_capability(
    name: &str,
    qualities: &[ExportQuality],
    max_resolution: (u32, u32),
    supports_alpha: bool,
) -> FormatCapability {
    FormatCapability {
        name: name.to_string(),
        supported_qualities: qualities.iter().map(|q| q.as_str().to_string()).collect(),
        max_resolution,
        supports_alpha,
    }
}
