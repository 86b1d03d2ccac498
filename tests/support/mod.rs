//! Shared helpers for integration tests: a mock Conversion Service and engine wiring.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use exporter_core::{EngineConfig, ExportEngine};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Mount point of the export API on the mock server.
pub const API_PREFIX: &str = "/api/export";

/// Base URL of the export API served by `server`.
pub fn api_url(server: &MockServer) -> String {
    format!("{}{API_PREFIX}", server.uri())
}

/// Full path of an endpoint under the API prefix.
pub fn endpoint(suffix: &str) -> String {
    format!("{API_PREFIX}/{suffix}")
}

/// Engine settings with short real-time delays so tests finish quickly.
pub fn fast_config(server: &MockServer, output_dir: &Path) -> EngineConfig {
    EngineConfig::new(&api_url(server))
        .expect("mock server URL is valid")
        .with_poll_interval(Duration::from_millis(20))
        .with_retry_base_delay(Duration::from_millis(10))
        .with_request_timeout(Duration::from_secs(5))
        .with_output_dir(output_dir)
}

pub fn engine(server: &MockServer, output_dir: &Path) -> ExportEngine {
    ExportEngine::new(fast_config(server, output_dir)).expect("engine should build")
}

pub fn status_body(job_id: &str, status: &str, progress: u8) -> Value {
    let mut body = json!({
        "job_id": job_id,
        "status": status,
        "progress": progress,
        "created_at": "2026-01-01T00:00:00",
    });
    if status == "complete" {
        body["download_url"] = json!(format!("{API_PREFIX}/download/{job_id}"));
        body["completed_at"] = json!("2026-01-01T00:00:09");
    }
    body
}

pub fn capabilities_body() -> Value {
    json!({
        "formats": {
            "mp4": {
                "name": "MP4 Exporter",
                "supported_qualities": ["low", "medium", "high", "ultra"],
                "max_resolution": [3840, 2160],
                "supports_alpha": false
            },
            "gif": {
                "name": "GIF Exporter",
                "supported_qualities": ["low", "medium"],
                "max_resolution": [480, 480],
                "supports_alpha": false
            }
        }
    })
}

/// Replies with each template in turn, repeating the last one once exhausted.
pub struct SequenceResponder {
    replies: Vec<ResponseTemplate>,
    calls: Arc<AtomicUsize>,
}

impl SequenceResponder {
    pub fn new(replies: Vec<ResponseTemplate>) -> Self {
        assert!(!replies.is_empty(), "sequence needs at least one reply");
        Self {
            replies,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of requests served so far.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies[index.min(self.replies.len() - 1)].clone()
    }
}

/// Mounts `GET /status/{job_id}` answering with `replies` in order.
pub async fn mount_status_sequence(
    server: &MockServer,
    job_id: &str,
    replies: Vec<ResponseTemplate>,
) -> Arc<AtomicUsize> {
    let responder = SequenceResponder::new(replies);
    let calls = responder.calls();
    Mock::given(method("GET"))
        .and(path(endpoint(&format!("status/{job_id}"))))
        .respond_with(responder)
        .mount(server)
        .await;
    calls
}

pub fn json_reply(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}
