//! Validates export requests and submits them to the service.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::constants::CONVERT_PATH;
use crate::error::ExportError;
use crate::model::{ConvertBody, ExportRequest, JobHandle, SubmitResponse};
use crate::transport::{ResilientTransport, ServiceRequest, TransportError};
use crate::validation::validate_format;

#[derive(Debug, Clone)]
pub struct JobSubmitter {
    transport: ResilientTransport,
}

impl JobSubmitter {
    #[must_use]
    pub fn new(transport: ResilientTransport) -> Self {
        Self { transport }
    }

    /// Submits `request` and returns the service's handle for the new job.
    ///
    /// Validation runs first; an invalid request never reaches the network.
    ///
    /// # Errors
    ///
    /// [`ExportError::Validation`] for a rejected request, otherwise
    /// [`ExportError::Network`] once the transport gives up or is cancelled.
    #[instrument(skip(self, request, cancel), fields(format = %request.format))]
    pub async fn submit(
        &self,
        request: &ExportRequest,
        cancel: &CancellationToken,
    ) -> Result<JobHandle, ExportError> {
        let format = validate_format(request)?;
        let body = serde_json::to_value(ConvertBody::new(request, format))
            .map_err(|e| TransportError::decode(CONVERT_PATH, e))?;
        let call = ServiceRequest::post_json(CONVERT_PATH, body);

        let response = self.transport.call(&call, cancel).await?;
        let accepted: SubmitResponse = response.json(&call.label())?;

        info!(
            job_id = %accepted.job_id,
            estimated_secs = ?accepted.estimated_time_seconds,
            "export job submitted"
        );
        Ok(JobHandle {
            job_id: accepted.job_id,
            estimated_time_seconds: accepted.estimated_time_seconds,
            created_at: Utc::now(),
            message: accepted.message,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::{ExportQuality, Resolution};
    use crate::test_support::{ScriptedTransport, resilient};
    use crate::transport::Method;
    use crate::validation::ValidationError;

    fn scenario_a_request() -> ExportRequest {
        ExportRequest::new("https://cdn.example.com/scene.glb", "mp4")
            .with_quality(ExportQuality::High)
            .with_resolution(Resolution::new(1920, 1080))
            .with_fps(30)
            .with_duration(15.0)
    }

    #[tokio::test]
    async fn test_submit_posts_request_and_builds_handle() {
        let scripted = ScriptedTransport::new();
        scripted.push_json(
            CONVERT_PATH,
            serde_json::json!({
                "job_id": "J1",
                "estimated_time_seconds": 12.5,
                "message": "Export job queued"
            }),
        );
        let (transport, _) = resilient(&scripted, &EngineConfig::default());
        let submitter = JobSubmitter::new(transport);

        let handle = submitter
            .submit(&scenario_a_request(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(handle.job_id, "J1");
        assert_eq!(handle.estimated_time_seconds, Some(12.5));
        assert_eq!(handle.message.as_deref(), Some("Export job queued"));

        let requests = scripted.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["format"], "mp4");
        assert_eq!(body["quality"], "high");
        assert_eq!(body["resolution"], serde_json::json!([1920, 1080]));
        assert_eq!(body["fps"], 30);
    }

    #[tokio::test]
    async fn test_submit_invalid_request_makes_no_call() {
        let scripted = ScriptedTransport::new();
        let (transport, metrics) = resilient(&scripted, &EngineConfig::default());
        let submitter = JobSubmitter::new(transport);
        let request = scenario_a_request().with_resolution(Resolution::new(100, 100));

        let err = submitter
            .submit(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExportError::Validation(ValidationError::ResolutionOutOfBounds { .. })
        ));
        assert_eq!(scripted.calls(), 0);
        assert_eq!(metrics.snapshot().total_requests, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_surfaces_network_error_after_retries() {
        let scripted = ScriptedTransport::new();
        for _ in 0..3 {
            scripted.push_status(CONVERT_PATH, 500);
        }
        let (transport, _) = resilient(&scripted, &EngineConfig::default());
        let submitter = JobSubmitter::new(transport);

        let err = submitter
            .submit(&scenario_a_request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Network(_)));
        assert_eq!(scripted.calls(), 3);
    }

    #[tokio::test]
    async fn test_submit_rejects_malformed_acceptance() {
        let scripted = ScriptedTransport::new();
        scripted.push_json(CONVERT_PATH, serde_json::json!({"message": "no id"}));
        let (transport, _) = resilient(&scripted, &EngineConfig::default());
        let submitter = JobSubmitter::new(transport);

        let err = submitter
            .submit(&scenario_a_request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExportError::Network(TransportError::Decode { .. })
        ));
    }
}
