//! Core graph data structures and the diff reducer

mod edge;
mod events;
mod node;
pub mod salience;
mod state;
mod store;


pub use edge::{ConceptEdge, EdgeKey};
pub use events::{ApplyReport, GraphObserver, MilestoneObserver, SkipReason, SkippedOp};
pub use node::{ConceptNode, NodePatch};
pub use state::GraphState;
pub use store::{apply_ops, apply_ops_with_report, GraphStore};
