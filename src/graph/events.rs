//! Apply reports and observers fired after each accepted diff
//!
//! Side effects of applying a diff (notifications, milestones) hang off
//! [`GraphObserver`] so the reducer itself stays pure.

use super::state::GraphState;
use std::sync::Mutex;

/// Why an individual op was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The op's tag is not one the reducer knows
    UnknownType(String),
    /// A required field was missing or of the wrong type
    MissingField { kind: String, field: &'static str },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownType(kind) => write!(f, "unknown op type: {}", kind),
            Self::MissingField { kind, field } => write!(f, "{} missing {}", kind, field),
        }
    }
}

/// A skipped op and its position in the diff
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOp {
    pub index: usize,
    pub reason: SkipReason,
}

/// What one diff did to the graph.
///
/// Partial success is normal: skipped ops are listed, siblings still apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Nodes that did not exist before
    pub nodes_created: usize,
    /// Existing nodes merged into
    pub nodes_updated: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
    /// Well-formed ops that changed nothing (duplicate edge, absent removal)
    pub no_ops: usize,
    pub skipped: Vec<SkippedOp>,
    /// Accepted diffs since the store was created or last hydrated
    pub diff_count: u64,
}

impl ApplyReport {
    /// Ops that took effect
    pub fn applied(&self) -> usize {
        self.nodes_created + self.nodes_updated + self.edges_added + self.edges_removed
    }

    /// True if no op was skipped
    pub fn is_fully_applied(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Subscriber notified after every accepted diff.
pub trait GraphObserver: Send + Sync {
    fn on_apply(&self, report: &ApplyReport, state: &GraphState);
}

/// Records the diff-count thresholds crossed so far.
///
/// Each threshold fires once per store lifetime; a hydrate resets the count
/// but not what was already announced.
#[derive(Debug)]
pub struct MilestoneObserver {
    thresholds: Vec<u64>,
    reached: Mutex<Vec<u64>>,
}

impl MilestoneObserver {
    pub fn new(mut thresholds: Vec<u64>) -> Self {
        thresholds.sort_unstable();
        thresholds.dedup();
        Self {
            thresholds,
            reached: Mutex::new(Vec::new()),
        }
    }

    /// Thresholds reached, in the order they fired
    pub fn reached(&self) -> Vec<u64> {
        self.reached.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl GraphObserver for MilestoneObserver {
    fn on_apply(&self, report: &ApplyReport, state: &GraphState) {
        let Ok(mut reached) = self.reached.lock() else {
            return;
        };
        for &threshold in &self.thresholds {
            if report.diff_count >= threshold && !reached.contains(&threshold) {
                reached.push(threshold);
                tracing::info!(
                    diffs = report.diff_count,
                    nodes = state.node_count(),
                    edges = state.edge_count(),
                    "concept graph milestone reached"
                );
            }
        }
    }
}
