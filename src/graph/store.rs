//! GraphStore: the reducer that applies diffs to the live graph

use super::events::{ApplyReport, GraphObserver, SkipReason, SkippedOp};
use super::state::GraphState;
use crate::diff::{Diff, DiffOp};
use std::sync::Arc;

/// Apply `ops` to a copy of `state`, in order.
///
/// Pure and deterministic: the same input state and op sequence always give
/// the same output. Display salience is recomputed once after the batch.
pub fn apply_ops(state: &GraphState, ops: &[DiffOp]) -> GraphState {
    apply_ops_with_report(state, ops).0
}

/// [`apply_ops`], also reporting what each op did
pub fn apply_ops_with_report(state: &GraphState, ops: &[DiffOp]) -> (GraphState, ApplyReport) {
    let mut next = state.clone();
    let mut report = ApplyReport::default();

    for (index, op) in ops.iter().enumerate() {
        match op {
            // add_node on an existing label is an upsert, same as update_node
            DiffOp::AddNode { label, patch } | DiffOp::UpdateNode { label, patch } => {
                if next.upsert_node(label, patch) {
                    report.nodes_created += 1;
                } else {
                    report.nodes_updated += 1;
                }
            }
            DiffOp::AddEdge(edge) => {
                if next.insert_edge(edge.clone()) {
                    report.edges_added += 1;
                } else {
                    report.no_ops += 1;
                }
            }
            DiffOp::RemoveEdge(key) => {
                if next.remove_edge(key) {
                    report.edges_removed += 1;
                } else {
                    report.no_ops += 1;
                }
            }
            DiffOp::Unrecognized { kind } => {
                tracing::debug!(index, kind = %kind, "skipping op with unknown type");
                report.skipped.push(SkippedOp {
                    index,
                    reason: SkipReason::UnknownType(kind.clone()),
                });
            }
            DiffOp::Malformed { kind, field } => {
                tracing::debug!(index, kind = %kind, field = *field, "skipping malformed op");
                report.skipped.push(SkippedOp {
                    index,
                    reason: SkipReason::MissingField {
                        kind: kind.clone(),
                        field: *field,
                    },
                });
            }
        }
    }

    if next.node_count() > 0 {
        next.refresh_display_salience();
    }
    (next, report)
}

/// Owner of the live graph.
///
/// The only writer is [`apply_diff`](Self::apply_diff); observers are
/// notified after each accepted diff.
#[derive(Default)]
pub struct GraphStore {
    state: GraphState,
    diff_count: u64,
    observers: Vec<Arc<dyn GraphObserver>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing graph (e.g. a hydrated snapshot)
    pub fn with_state(state: GraphState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Accepted diffs since creation or the last [`replace`](Self::replace)
    pub fn diff_count(&self) -> u64 {
        self.diff_count
    }

    pub fn subscribe(&mut self, observer: Arc<dyn GraphObserver>) {
        self.observers.push(observer);
    }

    /// Apply one validated diff and notify observers.
    pub fn apply_diff(&mut self, diff: &Diff) -> ApplyReport {
        let (next, mut report) = apply_ops_with_report(&self.state, &diff.ops);
        self.state = next;
        self.diff_count += 1;
        report.diff_count = self.diff_count;

        for observer in &self.observers {
            observer.on_apply(&report, &self.state);
        }
        report
    }

    /// Swap in a new graph and reset the diff counter
    pub fn replace(&mut self, mut state: GraphState) {
        state.refresh_display_salience();
        self.state = state;
        self.diff_count = 0;
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("nodes", &self.state.node_count())
            .field("edges", &self.state.edge_count())
            .field("diff_count", &self.diff_count)
            .field("observers", &self.observers.len())
            .finish()
    }
}
