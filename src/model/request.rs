//! Export request types submitted to the Conversion Service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output container formats the Conversion Service can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// H.264 video in an MP4 container.
    Mp4,
    /// Animated GIF.
    Gif,
    /// VP9 video with an alpha channel in a WebM container.
    WebmAlpha,
}

impl ExportFormat {
    /// All known formats, in display order.
    pub const ALL: [Self; 3] = [Self::Mp4, Self::Gif, Self::WebmAlpha];

    /// Returns the wire name of the format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Gif => "gif",
            Self::WebmAlpha => "webm_alpha",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known [`ExportFormat`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown export format '{0}'")]
pub struct UnknownFormat(pub String);

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "gif" => Ok(Self::Gif),
            "webm_alpha" => Ok(Self::WebmAlpha),
            _ => Err(UnknownFormat(value.to_string())),
        }
    }
}

/// Encoding quality preset. Which presets a format accepts is reported by
/// the service capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl ExportQuality {
    /// Returns the wire name of the quality preset.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }
}

impl fmt::Display for ExportQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportQuality {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "ultra" => Ok(Self::Ultra),
            other => Err(format!(
                "unknown quality '{other}' (expected low, medium, high or ultra)"
            )),
        }
    }
}

/// Output frame size in pixels. Serialized as `[width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl From<Resolution> for (u32, u32) {
    fn from(resolution: Resolution) -> Self {
        (resolution.width, resolution.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A caller's request to convert a source video into an export artifact.
///
/// `format` is kept as the caller supplied it; it is checked against the known
/// [`ExportFormat`] values by [`validate`](crate::validation::validate) before
/// anything is sent over the network.
///
/// # Example
///
/// ```
/// use exporter_core::{ExportQuality, ExportRequest, Resolution};
///
/// let request = ExportRequest::new("https://cdn.example.com/hologram.webm", "mp4")
///     .with_quality(ExportQuality::High)
///     .with_resolution(Resolution::new(1920, 1080))
///     .with_fps(30)
///     .with_duration(15.0);
/// assert!(exporter_core::validate(&request).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub source_url: String,
    pub format: String,
    #[serde(default)]
    pub quality: ExportQuality,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default)]
    pub alpha_channel: bool,
}

fn default_fps() -> u32 {
    30
}

fn default_duration() -> f64 {
    15.0
}

impl ExportRequest {
    /// Creates a request with the service defaults: medium quality, 1920x1080,
    /// 30 fps, 15 seconds, no alpha channel.
    #[must_use]
    pub fn new(source_url: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            format: format.into(),
            quality: ExportQuality::default(),
            resolution: Resolution::default(),
            fps: default_fps(),
            duration: default_duration(),
            alpha_channel: false,
        }
    }

    #[must_use]
    pub fn with_quality(mut self, quality: ExportQuality) -> Self {
        self.quality = quality;
        self
    }

    #[must_use]
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    #[must_use]
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn with_alpha_channel(mut self, alpha_channel: bool) -> Self {
        self.alpha_channel = alpha_channel;
        self
    }
}

/// Body of `POST /convert`, built from a request that already passed validation.
#[derive(Debug, Serialize)]
pub(crate) struct ConvertBody<'a> {
    pub source_url: &'a str,
    pub format: ExportFormat,
    pub quality: ExportQuality,
    pub resolution: Resolution,
    pub fps: u32,
    pub duration: f64,
    pub alpha_channel: bool,
}

impl<'a> ConvertBody<'a> {
    pub(crate) fn new(request: &'a ExportRequest, format: ExportFormat) -> Self {
        Self {
            source_url: request.source_url.trim(),
            format,
            quality: request.quality,
            resolution: request.resolution,
            fps: request.fps,
            duration: request.duration,
            alpha_channel: request.alpha_channel,
        }
    }
}
