//! Wire shapes exchanged with the conversational transport
//!
//! Outbound: [`ExtractionRequest`]. Inbound: [`ResponseEvent`] on completion
//! and [`ErrorEvent`] on failure, both echoing the request's metadata.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Metadata stamped on every extraction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "spaceName")]
    pub workspace_key: Option<String>,
    #[serde(alias = "oobCorrelationId")]
    pub correlation_id: String,
}

/// An out-of-band extraction request.
///
/// Text only, no tools, and detached from the transport's own conversation
/// memory: the window travels inline in `instructions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub instructions: String,
    pub metadata: RequestMetadata,
    pub modalities: Vec<String>,
    pub tools: Vec<Value>,
    pub conversation: String,
}

impl ExtractionRequest {
    pub fn new(instructions: impl Into<String>, metadata: RequestMetadata) -> Self {
        Self {
            instructions: instructions.into(),
            metadata,
            modalities: vec!["text".to_string()],
            tools: Vec::new(),
            conversation: "none".to_string(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.metadata.correlation_id
    }
}

/// Metadata echoed back on completions and errors; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "spaceName")]
    pub workspace_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "oobCorrelationId")]
    pub correlation_id: Option<String>,
}

impl From<&RequestMetadata> for ResponseMetadata {
    fn from(meta: &RequestMetadata) -> Self {
        Self {
            channel: Some(meta.channel.clone()),
            workspace_key: meta.workspace_key.clone(),
            correlation_id: Some(meta.correlation_id.clone()),
        }
    }
}

/// A finished response from the transport, on any channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: ResponseMetadata,
    #[serde(default)]
    pub output: Value,
}

impl ResponseEvent {
    /// A completion whose single content block is plain text
    pub fn text(id: impl Into<String>, metadata: ResponseMetadata, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            metadata,
            output: json!([{ "content": [{ "type": "text", "text": text.into() }] }]),
        }
    }

    /// A completion whose text arrived as an audio transcript
    pub fn audio_transcript(
        id: impl Into<String>,
        metadata: ResponseMetadata,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            metadata,
            output: json!([{ "content": [{ "type": "audio", "transcript": transcript.into() }] }]),
        }
    }

    pub fn channel(&self) -> Option<&str> {
        self.metadata.channel.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.metadata.correlation_id.as_deref()
    }

    pub fn workspace_key(&self) -> Option<&str> {
        self.metadata.workspace_key.as_deref()
    }

    /// The JSON document embedded in the first content block, if any.
    ///
    /// `text`/`input_text` blocks are read from `text`, `audio` blocks from
    /// `transcript`. Unparseable text yields `None`.
    pub fn json_payload(&self) -> Option<Value> {
        let block = self.output.get(0)?.get("content")?.get(0)?;
        let text = match block.get("type")?.as_str()? {
            "text" | "input_text" => block.get("text")?.as_str()?,
            "audio" => block.get("transcript")?.as_str()?,
            _ => return None,
        };
        serde_json::from_str(text).ok()
    }
}

/// A failed response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub metadata: ResponseMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorEvent {
    /// An error attributed to a specific request
    pub fn for_request(request: &ExtractionRequest, message: impl Into<String>) -> Self {
        Self {
            metadata: ResponseMetadata::from(&request.metadata),
            message: Some(message.into()),
        }
    }

    pub fn channel(&self) -> Option<&str> {
        self.metadata.channel.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.metadata.correlation_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> RequestMetadata {
        RequestMetadata {
            channel: "concept-graph".to_string(),
            workspace_key: Some("trips".to_string()),
            correlation_id: "c1".to_string(),
        }
    }

    #[test]
    fn request_serializes_text_only_without_tools() {
        let request = ExtractionRequest::new("extract", meta());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["modalities"], json!(["text"]));
        assert_eq!(json["tools"], json!([]));
        assert_eq!(json["conversation"], "none");
        assert_eq!(json["metadata"]["correlationId"], "c1");
        assert_eq!(json["metadata"]["workspaceKey"], "trips");
    }

    #[test]
    fn response_metadata_accepts_legacy_keys() {
        let event: ResponseEvent = serde_json::from_value(json!({
            "id": "resp_1",
            "metadata": { "channel": "concept-graph", "spaceName": "trips", "oobCorrelationId": "c9" }
        }))
        .unwrap();

        assert_eq!(event.workspace_key(), Some("trips"));
        assert_eq!(event.correlation_id(), Some("c9"));
    }

    #[test]
    fn payload_from_text_block() {
        let event = ResponseEvent::text("r", (&meta()).into(), r#"{"ops":[]}"#);
        assert_eq!(event.json_payload(), Some(json!({ "ops": [] })));
    }

    #[test]
    fn payload_from_input_text_block() {
        let event = ResponseEvent {
            output: json!([{ "content": [{ "type": "input_text", "text": "{\"ops\":[]}" }] }]),
            ..Default::default()
        };
        assert!(event.json_payload().is_some());
    }

    #[test]
    fn payload_from_audio_transcript() {
        let event = ResponseEvent::audio_transcript("r", (&meta()).into(), r#"{"ops":[1]}"#);
        assert_eq!(event.json_payload(), Some(json!({ "ops": [1] })));
    }

    #[test]
    fn payload_missing_or_invalid() {
        assert!(ResponseEvent::default().json_payload().is_none());
        assert!(ResponseEvent::text("r", ResponseMetadata::default(), "not json")
            .json_payload()
            .is_none());

        let image = ResponseEvent {
            output: json!([{ "content": [{ "type": "image", "text": "{}" }] }]),
            ..Default::default()
        };
        assert!(image.json_payload().is_none());
    }

    #[test]
    fn error_event_echoes_request_metadata() {
        let request = ExtractionRequest::new("extract", meta());
        let error = ErrorEvent::for_request(&request, "boom");
        assert_eq!(error.correlation_id(), Some("c1"));
        assert_eq!(error.channel(), Some("concept-graph"));
    }
}
