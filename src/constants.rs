//! Default values shared by the engine, its components, and the CLI.

use std::time::Duration;

/// Default Conversion Service base URL (all endpoint paths are joined onto it).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001/api/export/";

/// Hard timeout applied to every single transport attempt (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default HTTP connect timeout for the reqwest client (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default attempts per transport call, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay for linear transport retry backoff (`base * attempt`).
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Interval between status polls for a healthy job (2 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Consecutive transient poll failures tolerated before giving up.
pub const DEFAULT_POLL_MAX_ERRORS: u32 = 5;

/// Validity window of a fetched capability set (5 minutes).
pub const DEFAULT_CAPABILITIES_TTL: Duration = Duration::from_secs(5 * 60);

/// Delay before the temporary artifact handle is released after a save starts.
pub const DEFAULT_RELEASE_DELAY: Duration = Duration::from_millis(100);

/// Largest accepted timeout value for configurable timeouts (1 hour).
pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

/// Endpoint path for format capability metadata.
pub const CAPABILITIES_PATH: &str = "capabilities";

/// Endpoint path for job submission.
pub const CONVERT_PATH: &str = "convert";

/// Endpoint path prefix for job status (`status/{job_id}`).
pub const STATUS_PATH: &str = "status";

/// Endpoint path prefix for artifact download (`download/{job_id}`).
pub const DOWNLOAD_PATH: &str = "download";

/// Endpoint path for export history.
pub const HISTORY_PATH: &str = "history";

/// Endpoint path for service-wide export statistics.
pub const STATS_PATH: &str = "stats";

/// Number of history entries requested when the caller does not say.
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;
