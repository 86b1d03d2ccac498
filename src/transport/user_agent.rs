//! User-Agent string sent with every service request.

/// Default User-Agent for service requests (identifies the tool and version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("exporter/{version} ({})", std::env::consts::OS)
}
