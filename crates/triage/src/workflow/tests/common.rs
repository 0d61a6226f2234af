use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use secrecy::SecretString;
use serde_json::Value;

use crate::gate::AccessGate;
use crate::persistence::{MemorySink, ResponseRecord, ResponseRecorder, ResponseSink, SinkError};
use crate::survey::QuestionnaireDefinition;
use crate::workflow::{session_router, SessionId, TriageService};

pub(super) const ACCESS_CODE: &str = "abc";

pub(super) fn definition() -> Arc<QuestionnaireDefinition> {
    let raw = r#"{
        "meta": {"version": "2024-05", "title": "Ocena ryzyka", "disclaimer": "To nie jest diagnoza."},
        "paths": [
            {"id": "phishing", "label": "Phishing", "questions": [
                {"id": "q1", "text": "Kliknięto link?", "type": "tri", "weight_yes": 2, "weight_maybe": 1},
                {"id": "q2", "text": "Co podano?", "type": "select", "options": [
                    {"label": "nic", "weight": 0},
                    {"label": "hasło", "weight": 3}
                ]},
                {"id": "q3", "text": "Zgłoszono?", "type": "tri", "weight_yes": 1, "noscore": true}
            ]},
            {"id": "malware", "label": "Malware", "questions": [
                {"id": "m1", "text": "Uruchomiono plik?", "type": "tri", "weight_yes": 4}
            ]},
            {"id": "empty", "label": "Pusta", "questions": []}
        ]
    }"#;
    Arc::new(QuestionnaireDefinition::from_json_str(raw).expect("fixture parses"))
}

pub(super) fn gate() -> AccessGate {
    AccessGate::new(SecretString::new(ACCESS_CODE.to_string()))
}

pub(super) fn build_service() -> (Arc<TriageService>, MemorySink) {
    let memory = MemorySink::default();
    let recorder = ResponseRecorder::new().with_sink(Arc::new(memory.clone()));
    let service = Arc::new(TriageService::new(definition(), gate(), recorder));
    (service, memory)
}

pub(super) fn build_service_with_idle_timeout(idle_timeout: Duration) -> Arc<TriageService> {
    let service = TriageService::new(definition(), gate(), ResponseRecorder::new())
        .with_idle_timeout(idle_timeout);
    Arc::new(service)
}

pub(super) fn build_service_with_failing_sink() -> (Arc<TriageService>, MemorySink) {
    let memory = MemorySink::default();
    let recorder = ResponseRecorder::new()
        .with_sink(Arc::new(FailingSink))
        .with_sink(Arc::new(memory.clone()));
    let service = Arc::new(TriageService::new(definition(), gate(), recorder));
    (service, memory)
}

pub(super) fn open(service: &TriageService) -> SessionId {
    let view = service.open_session(ACCESS_CODE).expect("session opens");
    SessionId(view.session_id)
}

pub(super) fn router(service: Arc<TriageService>) -> axum::Router {
    session_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) struct FailingSink;

#[async_trait]
impl ResponseSink for FailingSink {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn record(&self, _record: &ResponseRecord) -> Result<(), SinkError> {
        Err(SinkError::Rejected { status: 503 })
    }
}
