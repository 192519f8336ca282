//! Transport and extractor seams
//!
//! The engine only ever submits requests; results come back later as
//! completion or error events through an [`EngineHandle`]. Two adapters:
//! - `ExtractorTransport`: wraps an opaque [`Extractor`] call into that event flow
//! - `RecordingTransport`: remembers submissions without answering (testing)

use super::events::{ErrorEvent, ExtractionRequest, ResponseEvent, ResponseMetadata};
use crate::sync::EngineHandle;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport not available: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Where extraction requests are sent.
///
/// `submit` returns once the request is handed off, not when it completes.
#[async_trait]
pub trait ConversationTransport: Send + Sync {
    async fn submit(&self, request: ExtractionRequest) -> TransportResult<()>;
}

/// The language-model call: instructions in, diff JSON text out.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, instructions: &str) -> TransportResult<String>;
}

/// Runs each submitted request through an [`Extractor`] in the background
/// and reports the outcome to the engine with the request's metadata echoed.
pub struct ExtractorTransport {
    extractor: Arc<dyn Extractor>,
    events: EngineHandle,
}

impl ExtractorTransport {
    pub fn new(extractor: Arc<dyn Extractor>, events: EngineHandle) -> Self {
        Self { extractor, events }
    }
}

#[async_trait]
impl ConversationTransport for ExtractorTransport {
    async fn submit(&self, request: ExtractionRequest) -> TransportResult<()> {
        let extractor = self.extractor.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            match extractor.extract(&request.instructions).await {
                Ok(text) => {
                    let metadata = ResponseMetadata::from(&request.metadata);
                    let response_id = format!("resp_{}", Uuid::new_v4().simple());
                    events.response_done(ResponseEvent::text(response_id, metadata, text));
                }
                Err(e) => {
                    events.response_failed(ErrorEvent::for_request(&request, e.to_string()));
                }
            }
        });
        Ok(())
    }
}

enum Scripted {
    Respond(String),
    Fail(String),
}

/// Extractor that replays a script, one entry per call.
pub struct MockExtractor {
    script: Mutex<VecDeque<Scripted>>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.push(Scripted::Respond(text.into()))
    }

    /// Queue a failure
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Fail(message.into()))
    }

    /// Simulated latency per call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Instructions received so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn push(self, entry: Scripted) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
        self
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(&self, instructions: &str) -> TransportResult<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(instructions.to_string());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match next {
            Some(Scripted::Respond(text)) => Ok(text),
            Some(Scripted::Fail(message)) => Err(TransportError::ExtractionFailed(message)),
            None => Err(TransportError::Unavailable(
                "mock extractor script exhausted".to_string(),
            )),
        }
    }
}

/// Transport that records submissions and never answers.
#[derive(Default)]
pub struct RecordingTransport {
    submitted: Mutex<Vec<ExtractionRequest>>,
    reject: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that refuses every submission
    pub fn rejecting() -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn submitted(&self) -> Vec<ExtractionRequest> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ConversationTransport for RecordingTransport {
    async fn submit(&self, request: ExtractionRequest) -> TransportResult<()> {
        if self.reject {
            return Err(TransportError::Rejected("recording transport rejects".to_string()));
        }
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(request);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{engine_channel, EngineInput};
    use crate::transport::RequestMetadata;

    fn request(correlation_id: &str) -> ExtractionRequest {
        ExtractionRequest::new(
            "instructions",
            RequestMetadata {
                channel: "concept-graph".to_string(),
                workspace_key: None,
                correlation_id: correlation_id.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn mock_replays_script_in_order() {
        let mock = MockExtractor::new().respond("first").fail("second");

        assert_eq!(mock.extract("a").await.unwrap(), "first");
        assert!(matches!(
            mock.extract("b").await,
            Err(TransportError::ExtractionFailed(_))
        ));
        assert!(matches!(
            mock.extract("c").await,
            Err(TransportError::Unavailable(_))
        ));
        assert_eq!(mock.calls(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn extractor_transport_reports_completion() {
        let (handle, mut inbox) = engine_channel();
        let transport =
            ExtractorTransport::new(Arc::new(MockExtractor::new().respond(r#"{"ops":[]}"#)), handle);

        transport.submit(request("c1")).await.unwrap();

        match inbox.recv().await {
            Some(EngineInput::ResponseDone(event)) => {
                assert_eq!(event.correlation_id(), Some("c1"));
                assert_eq!(event.channel(), Some("concept-graph"));
                assert!(event.id.is_some());
                assert!(event.json_payload().is_some());
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn extractor_transport_reports_failure() {
        let (handle, mut inbox) = engine_channel();
        let transport = ExtractorTransport::new(Arc::new(MockExtractor::new().fail("model down")), handle);

        transport.submit(request("c2")).await.unwrap();

        match inbox.recv().await {
            Some(EngineInput::ResponseFailed(event)) => {
                assert_eq!(event.correlation_id(), Some("c2"));
                assert!(event.message.unwrap().contains("model down"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn recording_transport_records_or_rejects() {
        let recording = RecordingTransport::new();
        recording.submit(request("c1")).await.unwrap();
        assert_eq!(recording.submitted().len(), 1);

        let rejecting = RecordingTransport::rejecting();
        assert!(rejecting.submit(request("c1")).await.is_err());
    }
}
