//! Client-side validation of export requests.
//!
//! Validation is synchronous, has no side effects, and never touches the
//! network. Rules are checked in a fixed order and the first violation wins:
//!
//! | Order | Rule | Error |
//! |-------|------|-------|
//! | 1 | `source_url` is non-empty | [`ValidationError::MissingSource`] |
//! | 2 | `format` is `mp4`, `gif` or `webm_alpha` | [`ValidationError::InvalidFormat`] |
//! | 3 | `320 <= width <= 7680`, `240 <= height <= 4320` | [`ValidationError::ResolutionOutOfBounds`] |
//! | 4 | `10 <= fps <= 120` | [`ValidationError::FpsOutOfBounds`] |
//! | 5 | `0.5 <= duration <= 300` seconds | [`ValidationError::DurationOutOfBounds`] |

use std::ops::RangeInclusive;

use thiserror::Error;

use crate::model::{ExportFormat, ExportRequest};

pub const WIDTH_RANGE: RangeInclusive<u32> = 320..=7680;
pub const HEIGHT_RANGE: RangeInclusive<u32> = 240..=4320;
pub const FPS_RANGE: RangeInclusive<u32> = 10..=120;
pub const DURATION_RANGE: RangeInclusive<f64> = 0.5..=300.0;

/// A request rejected before submission. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("source URL is required")]
    MissingSource,

    #[error("invalid format '{format}': expected mp4, gif or webm_alpha")]
    InvalidFormat { format: String },

    #[error(
        "resolution {width}x{height} out of bounds (min {min_w}x{min_h}, max {max_w}x{max_h})",
        min_w = WIDTH_RANGE.start(),
        min_h = HEIGHT_RANGE.start(),
        max_w = WIDTH_RANGE.end(),
        max_h = HEIGHT_RANGE.end()
    )]
    ResolutionOutOfBounds { width: u32, height: u32 },

    #[error("fps {fps} out of bounds ({min}-{max})", min = FPS_RANGE.start(), max = FPS_RANGE.end())]
    FpsOutOfBounds { fps: u32 },

    #[error(
        "duration {duration}s out of bounds ({min}-{max}s)",
        min = DURATION_RANGE.start(),
        max = DURATION_RANGE.end()
    )]
    DurationOutOfBounds { duration: f64 },
}

/// Checks `request` against the static bounds.
///
/// # Errors
///
/// Returns the [`ValidationError`] for the first rule the request violates.
pub fn validate(request: &ExportRequest) -> Result<(), ValidationError> {
    validate_format(request).map(|_| ())
}

/// Validates `request` and returns its parsed format.
pub(crate) fn validate_format(request: &ExportRequest) -> Result<ExportFormat, ValidationError> {
    if request.source_url.trim().is_empty() {
        return Err(ValidationError::MissingSource);
    }

    let format: ExportFormat =
        request
            .format
            .parse()
            .map_err(|_| ValidationError::InvalidFormat {
                format: request.format.clone(),
            })?;

    let resolution = request.resolution;
    if !WIDTH_RANGE.contains(&resolution.width) || !HEIGHT_RANGE.contains(&resolution.height) {
        return Err(ValidationError::ResolutionOutOfBounds {
            width: resolution.width,
            height: resolution.height,
        });
    }

    if !FPS_RANGE.contains(&request.fps) {
        return Err(ValidationError::FpsOutOfBounds { fps: request.fps });
    }

    // NaN fails `contains`, so it is rejected here as well.
    if !DURATION_RANGE.contains(&request.duration) {
        return Err(ValidationError::DurationOutOfBounds {
            duration: request.duration,
        });
    }

    Ok(format)
}
