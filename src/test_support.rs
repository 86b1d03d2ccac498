//! In-process transport with per-path scripted outcomes for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::metrics::MetricsCollector;
use crate::transport::{
    ResilientTransport, ServiceRequest, ServiceResponse, Transport, TransportError,
};

/// One scripted reply.
#[derive(Debug)]
pub(crate) enum Step {
    Reply(Result<ServiceResponse, TransportError>),
    /// Never resolves; only a timeout or cancellation ends the attempt.
    Hang,
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<ServiceRequest>>,
}

#[allow(clippy::unwrap_used)]
impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push(&self, path: &str, step: Step) {
        self.script
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(step);
    }

    pub(crate) fn push_json(&self, path: &str, value: serde_json::Value) {
        self.push(path, Step::Reply(Ok(ServiceResponse::json_body(&value))));
    }

    pub(crate) fn push_status(&self, path: &str, status: u16) {
        self.push(
            path,
            Step::Reply(Err(TransportError::http_status(path, status))),
        );
    }

    pub(crate) fn push_hang(&self, path: &str) {
        self.push(path, Step::Hang);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    pub(crate) fn requests(&self) -> Vec<ServiceRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    #[allow(clippy::unwrap_used)]
    async fn execute(&self, request: &ServiceRequest) -> Result<ServiceResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        let step = self
            .script
            .lock()
            .unwrap()
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front);
        match step {
            Some(Step::Reply(outcome)) => outcome,
            Some(Step::Hang) => std::future::pending().await,
            None => Err(TransportError::connection(
                &request.path,
                "no scripted response",
            )),
        }
    }
}

/// Wraps `scripted` the way the engine does, with metrics attached.
pub(crate) fn resilient(
    scripted: &Arc<ScriptedTransport>,
    config: &EngineConfig,
) -> (ResilientTransport, Arc<MetricsCollector>) {
    let metrics = Arc::new(MetricsCollector::new());
    let transport = ResilientTransport::new(
        Arc::clone(scripted) as Arc<dyn Transport>,
        config.retry_policy(),
        Arc::clone(&metrics),
    );
    (transport, metrics)
}
