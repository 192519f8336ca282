//! Mindweave: Incremental Concept-Graph Synchronization Engine
//!
//! Keeps a small concept graph in step with a live conversation. Finalized
//! turns are debounced into extraction requests; each completion carries a
//! diff (add/update nodes, add/remove edges) that is applied to the graph
//! only if it answers the most recent request.
//!
//! # Core Concepts
//!
//! - **Graph**: concept nodes keyed by label and labelled, possibly dangling edges
//! - **Diff**: a batch of edit ops produced by one extraction call
//! - **Correlation id**: ties a completion to its request; stale ones are ignored
//! - **Snapshot**: the persisted graph of one workspace
//!
//! # Example
//!
//! ```
//! use mindweave::{apply_ops, parse_diff_str, GraphState};
//!
//! let diff = parse_diff_str(r#"{"ops":[{"add_node":{"label":"kayaking","salience":7}}]}"#).unwrap();
//! let state = apply_ops(&GraphState::new(), &diff.ops);
//! assert_eq!(state.display_salience("kayaking"), Some(1));
//! ```

pub mod config;
pub mod diff;
pub mod graph;
pub mod snapshot;
pub mod sync;
pub mod transport;

pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use diff::{parse_diff, parse_diff_str, validate, Diff, DiffError, DiffOp, DiffResult};
pub use graph::{
    apply_ops, apply_ops_with_report, ApplyReport, ConceptEdge, ConceptNode, EdgeKey,
    GraphObserver, GraphState, GraphStore, MilestoneObserver, NodePatch,
};
pub use snapshot::{
    hydrate, serialize, MemorySnapshotStore, SaveOutcome, SaveReceipt, Snapshot, SnapshotBridge,
    SnapshotStore, SqliteSnapshotStore, StorageError, StorageResult,
};
pub use sync::{
    engine_channel, EngineDriver, EngineHandle, InFlightCoordinator, RequestScheduler, SyncEngine,
};
pub use transport::{
    ConversationTransport, ErrorEvent, ExtractionRequest, Extractor, ExtractorTransport,
    ResponseEvent, Role, TranscriptTurn, TransportError, TransportResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
