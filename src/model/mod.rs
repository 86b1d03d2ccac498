//! Data model shared between the engine and its callers.

mod capability;
mod job;
mod request;

pub use capability::{CapabilitySet, CapabilitySource, FormatCapability};
pub(crate) use capability::CapabilitiesResponse;
pub use job::{ExportHistoryEntry, JobHandle, JobState, JobStatus, ServiceStats};
pub(crate) use job::{HistoryResponse, StatsResponse, SubmitResponse};
pub(crate) use request::ConvertBody;
pub use request::{ExportFormat, ExportQuality, ExportRequest, Resolution, UnknownFormat};
