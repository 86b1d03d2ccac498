//! Integration tests for the export engine against a mock Conversion Service.
//!
//! Every test drives the public `ExportEngine` API over real HTTP.

mod support;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use exporter_core::{
    ExportError, ExportQuality, ExportRequest, JobState, Resolution, ValidationError,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{
    capabilities_body, endpoint, engine, fast_config, json_reply, mount_status_sequence,
    status_body,
};

fn scenario_request() -> ExportRequest {
    ExportRequest::new("https://cdn.example.com/hologram.webm", "mp4")
        .with_quality(ExportQuality::High)
        .with_resolution(Resolution::new(1920, 1080))
        .with_fps(30)
        .with_duration(15.0)
}

// ==================== Submit and poll ====================

#[tokio::test]
async fn test_submit_poll_complete_happy_path() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("POST"))
        .and(path(endpoint("convert")))
        .and(body_partial_json(json!({
            "format": "mp4",
            "quality": "high",
            "resolution": [1920, 1080],
            "fps": 30,
            "duration": 15.0,
            "alpha_channel": false
        })))
        .respond_with(json_reply(json!({
            "job_id": "J1",
            "estimated_time_seconds": 9.0,
            "message": "Export job queued"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let status_calls = mount_status_sequence(
        &server,
        "J1",
        vec![
            json_reply(status_body("J1", "pending", 0)),
            json_reply(status_body("J1", "processing", 40)),
            json_reply(status_body("J1", "processing", 80)),
            json_reply(status_body("J1", "complete", 100)),
        ],
    )
    .await;

    let engine = engine(&server, out.path());
    let handle = engine
        .submit_export(&scenario_request())
        .await
        .expect("submit should succeed");
    assert_eq!(handle.job_id, "J1");
    assert_eq!(handle.estimated_time_seconds, Some(9.0));

    let mut seen = Vec::new();
    let status = engine
        .poll_until_complete("J1", |s| seen.push(s.progress))
        .await
        .expect("job should complete");

    assert_eq!(status.status, JobState::Complete);
    assert_eq!(status.download_url.as_deref(), Some("/api/export/download/J1"));
    assert_eq!(seen, vec![0, 40, 80]);
    assert_eq!(status_calls.load(Ordering::SeqCst), 4);
    assert!(engine.active_jobs().is_empty());

    let metrics = engine.get_metrics();
    assert_eq!(metrics.total_requests, 5);
    assert_eq!(metrics.successful_requests, 5);
    assert_eq!(metrics.failed_requests, 0);
    assert_eq!(metrics.active_polls, 0);
}

#[tokio::test]
async fn test_invalid_request_makes_no_network_call() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let request = scenario_request().with_resolution(Resolution::new(100, 100));
    let err = engine.submit_export(&request).await.unwrap_err();

    assert!(matches!(
        err,
        ExportError::Validation(ValidationError::ResolutionOutOfBounds { .. })
    ));
    assert_eq!(engine.get_metrics().total_requests, 0);
}

#[tokio::test]
async fn test_submit_retries_server_errors() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("POST"))
        .and(path(endpoint("convert")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(endpoint("convert")))
        .respond_with(json_reply(json!({ "job_id": "J7" })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let handle = engine.submit_export(&scenario_request()).await.unwrap();

    assert_eq!(handle.job_id, "J7");
    let metrics = engine.get_metrics();
    assert_eq!(metrics.total_requests, 3);
    assert_eq!(metrics.successful_requests, 1);
    assert_eq!(metrics.failed_requests, 0);
}

#[tokio::test]
async fn test_submit_does_not_retry_client_errors() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("POST"))
        .and(path(endpoint("convert")))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "detail": "unsupported codec" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let err = engine.submit_export(&scenario_request()).await.unwrap_err();

    match err {
        ExportError::Network(e) => {
            assert_eq!(e.status(), Some(422));
            assert!(e.to_string().contains("unsupported codec"));
        }
        other => panic!("expected network error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_poll_unknown_job_is_not_retried() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(endpoint("status/J2")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Job not found" })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let err = engine.poll_until_complete("J2", |_| {}).await.unwrap_err();

    assert!(matches!(err, ExportError::JobNotFound { ref job_id } if job_id == "J2"));
    assert!(engine.active_jobs().is_empty());
}

#[tokio::test]
async fn test_poll_failed_job_carries_server_message() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    let mut failed = status_body("J3", "failed", 30);
    failed["error"] = json!("ffmpeg exited with status 1");
    mount_status_sequence(
        &server,
        "J3",
        vec![
            json_reply(status_body("J3", "processing", 30)),
            json_reply(failed),
        ],
    )
    .await;

    let engine = engine(&server, out.path());
    let err = engine.poll_until_complete("J3", |_| {}).await.unwrap_err();

    match err {
        ExportError::JobFailed { job_id, message } => {
            assert_eq!(job_id, "J3");
            assert_eq!(message, "ffmpeg exited with status 1");
        }
        other => panic!("expected job failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_poll_recovers_from_transient_errors() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    let calls = mount_status_sequence(
        &server,
        "J4",
        vec![
            ResponseTemplate::new(500),
            ResponseTemplate::new(502),
            json_reply(status_body("J4", "processing", 50)),
            ResponseTemplate::new(503),
            json_reply(status_body("J4", "complete", 100)),
        ],
    )
    .await;

    let engine = engine(&server, out.path());
    let status = engine.poll_until_complete("J4", |_| {}).await.unwrap();

    assert_eq!(status.status, JobState::Complete);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_poll_gives_up_after_consecutive_errors() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    let calls =
        mount_status_sequence(&server, "J5", vec![ResponseTemplate::new(500)]).await;

    let config = fast_config(&server, out.path()).with_poll_max_errors(3);
    let engine = exporter_core::ExportEngine::new(config).unwrap();
    let err = engine.poll_until_complete("J5", |_| {}).await.unwrap_err();

    match err {
        ExportError::PollExhausted {
            job_id, attempts, ..
        } => {
            assert_eq!(job_id, "J5");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected poll exhaustion, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_cancel_stops_polling() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    let calls = mount_status_sequence(
        &server,
        "J6",
        vec![json_reply(status_body("J6", "processing", 10))],
    )
    .await;

    let engine = Arc::new(engine(&server, out.path()));
    let poller = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.poll_until_complete("J6", |_| {}).await })
    };

    while calls.load(Ordering::SeqCst) < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(engine.cancel("J6"));

    let err = poller.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert!(engine.active_jobs().is_empty());
    assert!(!engine.cancel("J6"));

    let settled = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), settled);
}

#[tokio::test]
async fn test_progress_never_decreases() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    mount_status_sequence(
        &server,
        "J8",
        vec![
            json_reply(status_body("J8", "processing", 60)),
            json_reply(status_body("J8", "processing", 20)),
            json_reply(status_body("J8", "processing", 70)),
            json_reply(status_body("J8", "complete", 100)),
        ],
    )
    .await;

    let engine = engine(&server, out.path());
    let seen = Mutex::new(Vec::new());
    engine
        .poll_until_complete("J8", |s| seen.lock().unwrap().push(s.progress))
        .await
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen, vec![60, 60, 70]);
}

// ==================== Capabilities ====================

#[tokio::test]
async fn test_capabilities_cached_within_ttl() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(endpoint("capabilities")))
        .respond_with(json_reply(capabilities_body()))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let first = engine.get_capabilities().await;
    let second = engine.get_capabilities().await;

    assert!(!first.is_fallback());
    assert_eq!(first.formats, second.formats);
    let gif = &first.formats["gif"];
    assert_eq!(gif.max_resolution, (480, 480));
    assert!(!first.supports_quality(exporter_core::ExportFormat::Gif, ExportQuality::High));
}

#[tokio::test]
async fn test_capabilities_refetched_after_invalidate() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(endpoint("capabilities")))
        .respond_with(json_reply(capabilities_body()))
        .expect(2)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    engine.get_capabilities().await;
    engine.invalidate_capabilities().await;
    engine.get_capabilities().await;
}

#[tokio::test]
async fn test_capabilities_fall_back_when_service_down() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(endpoint("capabilities")))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let caps = engine.get_capabilities().await;
    let again = engine.get_capabilities().await;

    assert!(caps.is_fallback());
    assert!(again.is_fallback());
    assert!(caps.formats["webm_alpha"].supports_alpha);
    assert_eq!(caps.formats["gif"].max_resolution, (640, 640));
}

// ==================== Download ====================

#[tokio::test]
async fn test_download_saves_with_content_disposition_name() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    let payload = b"\x00\x00\x00\x18ftypmp42 fake video".to_vec();
    Mock::given(method("GET"))
        .and(path(endpoint("download/J1")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", r#"attachment; filename="hologram_J1.mp4""#)
                .insert_header("Content-Type", "video/mp4")
                .set_body_bytes(payload.clone()),
        )
        .expect(2)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let first = engine.download_artifact("J1", None).await.unwrap();
    let second = engine.download_artifact("J1", None).await.unwrap();

    assert_eq!(first.path, out.path().join("hologram_J1.mp4"));
    assert_eq!(second.path, out.path().join("hologram_J1_1.mp4"));
    assert_eq!(first.size_bytes, payload.len());
    assert_eq!(std::fs::read(&first.path).unwrap(), payload);
}

#[tokio::test]
async fn test_download_caller_filename_and_default() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(endpoint("download/J9")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"gif89a".to_vec()))
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let named = engine
        .download_artifact("J9", Some("loop.gif"))
        .await
        .unwrap();
    let unnamed = engine.download_artifact("J9", None).await.unwrap();

    assert_eq!(named.path, out.path().join("loop.gif"));
    assert_eq!(unnamed.path, out.path().join("export_J9"));
}

#[tokio::test]
async fn test_download_errors_map_to_export_errors() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(endpoint("download/missing")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(endpoint("download/busy")))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "detail": "Export not completed" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let missing = engine.download_artifact("missing", None).await.unwrap_err();
    let busy = engine.download_artifact("busy", None).await.unwrap_err();

    assert!(matches!(missing, ExportError::JobNotFound { .. }));
    assert!(matches!(busy, ExportError::Network(ref e) if e.status() == Some(400)));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

// ==================== History and stats ====================

#[tokio::test]
async fn test_history_passes_limit() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(endpoint("history")))
        .and(query_param("limit", "2"))
        .respond_with(json_reply(json!({
            "exports": [
                {
                    "job_id": "J2", "format": "gif", "quality": "low",
                    "status": "complete", "created_at": "2026-01-02T00:00:00",
                    "file_size_mb": 1.5, "download_url": "/api/export/download/J2"
                },
                {
                    "job_id": "J1", "format": "mp4", "quality": "high",
                    "status": "failed", "created_at": "2026-01-01T00:00:00"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let history = engine.history(2).await.unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].job_id, "J2");
    assert_eq!(history[0].file_size_mb, Some(1.5));
    assert_eq!(history[1].status, JobState::Failed);
    assert!(history[1].download_url.is_none());
}

#[tokio::test]
async fn test_service_stats() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(endpoint("stats")))
        .respond_with(json_reply(json!({
            "stats": {
                "total_exports": 3,
                "exports_by_format": { "mp4": 2, "gif": 1 },
                "total_export_time": 12.5,
                "total_output_size_gb": 0.25,
                "available_formats": 3,
                "avg_export_time": "4.17s",
                "formats": ["mp4", "gif", "webm_alpha"]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server, out.path());
    let stats = engine.service_stats().await.unwrap();

    assert_eq!(stats.total_exports, 3);
    assert_eq!(stats.exports_by_format["mp4"], 2);
    assert_eq!(stats.avg_export_time, "4.17s");
    assert_eq!(stats.formats.len(), 3);
}

// ==================== Shutdown ====================

#[tokio::test]
async fn test_shutdown_cancels_active_polls() {
    let server = MockServer::start().await;
    let out = TempDir::new().expect("failed to create temp dir");

    mount_status_sequence(
        &server,
        "J10",
        vec![json_reply(status_body("J10", "processing", 5))],
    )
    .await;

    let engine = Arc::new(engine(&server, out.path()));
    let poller = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.poll_until_complete("J10", |_| {}).await })
    };
    while engine.active_jobs().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    engine.shutdown();

    let err = poller.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert!(engine.is_shut_down());
    assert!(engine.active_jobs().is_empty());

    let err = engine.poll_until_complete("J11", |_| {}).await.unwrap_err();
    assert!(err.is_cancelled());
}
