//! Interfaces to the conversational transport and the extraction call

mod client;
mod events;
mod window;

pub use client::{
    ConversationTransport, Extractor, ExtractorTransport, MockExtractor, RecordingTransport,
    TransportError, TransportResult,
};
pub use events::{ErrorEvent, ExtractionRequest, RequestMetadata, ResponseEvent, ResponseMetadata};
pub use window::{render_instructions, Role, Transcript, TranscriptTurn, TurnKind};
