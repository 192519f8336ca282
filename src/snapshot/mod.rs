//! Workspace snapshots: the persisted form of a graph and where it is kept

mod bridge;
mod model;
mod store;

pub use bridge::{SaveOutcome, SnapshotBridge};
pub use model::{
    hydrate, node_id, serialize, SaveReceipt, Snapshot, SnapshotEdge, SnapshotNode, SCHEMA_VERSION,
};
pub use store::{
    MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore, StorageError, StorageResult,
};
