//! GraphState: the live concept graph of one workspace

use super::edge::{ConceptEdge, EdgeKey};
use super::node::{ConceptNode, NodePatch};
use super::salience;
use std::collections::{BTreeMap, HashSet};

/// Nodes keyed by label, edges in insertion order, and the derived display
/// salience of every node.
///
/// Invariants:
/// - at most one node per label
/// - no two edges share an [`EdgeKey`]
/// - `display_salience` has an entry for exactly the current nodes
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    nodes: BTreeMap<String, ConceptNode>,
    edges: Vec<ConceptEdge>,
    edge_keys: HashSet<EdgeKey>,
    display_salience: BTreeMap<String, u8>,
}

impl GraphState {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from raw parts.
    ///
    /// Later nodes with a repeated label are merged over earlier ones and
    /// repeated edge keys keep their first occurrence, so the invariants hold
    /// whatever the input.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = ConceptNode>,
        edges: impl IntoIterator<Item = ConceptEdge>,
    ) -> Self {
        let mut state = Self::new();
        for node in nodes {
            let patch = NodePatch {
                summary: node.summary,
                keywords: node.keywords,
                salience: node.salience,
            };
            state.upsert_node(&node.label, &patch);
        }
        for edge in edges {
            state.insert_edge(edge);
        }
        state.refresh_display_salience();
        state
    }

    /// Merge `patch` into the node named `label`, creating it if absent.
    ///
    /// Returns true if the node was created. Display salience is left stale
    /// until [`refresh_display_salience`](Self::refresh_display_salience).
    pub fn upsert_node(&mut self, label: &str, patch: &NodePatch) -> bool {
        match self.nodes.get_mut(label) {
            Some(existing) => {
                existing.merge(patch);
                false
            }
            None => {
                let mut node = ConceptNode::new(label);
                node.merge(patch);
                self.nodes.insert(label.to_string(), node);
                true
            }
        }
    }

    /// Insert an edge unless one with the same key exists.
    ///
    /// Returns true if the edge was inserted.
    pub fn insert_edge(&mut self, edge: ConceptEdge) -> bool {
        if !self.edge_keys.insert(edge.key()) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Remove the edge with exactly this key. Returns true if one was removed.
    pub fn remove_edge(&mut self, key: &EdgeKey) -> bool {
        if !self.edge_keys.remove(key) {
            return false;
        }
        self.edges.retain(|e| &e.key() != key);
        true
    }

    /// Recompute display salience for every node
    pub fn refresh_display_salience(&mut self) {
        self.display_salience = salience::normalize(self.nodes.values());
    }

    pub fn get_node(&self, label: &str) -> Option<&ConceptNode> {
        self.nodes.get(label)
    }

    /// Nodes in label order
    pub fn nodes(&self) -> impl Iterator<Item = &ConceptNode> {
        self.nodes.values()
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &ConceptEdge> {
        self.edges.iter()
    }

    pub fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.edge_keys.contains(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Presentation-only salience of a node, 1..=10
    pub fn display_salience(&self, label: &str) -> Option<u8> {
        self.display_salience.get(label).copied()
    }
}

/// Graphs compare by nodes and edges; display salience is derived and ignored.
impl PartialEq for GraphState {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_reports_creation_once() {
        let mut state = GraphState::new();
        assert!(state.upsert_node("X", &NodePatch::new().with_salience(3.0)));
        assert!(!state.upsert_node("X", &NodePatch::new().with_summary("s")));

        assert_eq!(state.node_count(), 1);
        let node = state.get_node("X").unwrap();
        assert_eq!(node.salience, Some(3.0));
        assert_eq!(node.summary.as_deref(), Some("s"));
    }

    #[test]
    fn labels_are_case_sensitive() {
        let mut state = GraphState::new();
        state.upsert_node("Rust", &NodePatch::new());
        state.upsert_node("rust", &NodePatch::new());
        assert_eq!(state.node_count(), 2);
    }

    #[test]
    fn duplicate_edge_key_is_rejected() {
        let mut state = GraphState::new();
        assert!(state.insert_edge(ConceptEdge::new("a", "b").with_relation("r")));
        assert!(!state.insert_edge(ConceptEdge::new("a", "b").with_relation("r").with_confidence(0.4)));
        assert_eq!(state.edge_count(), 1);
        assert_eq!(state.edges().next().unwrap().confidence, None);
    }

    #[test]
    fn remove_edge_keeps_key_set_in_sync() {
        let mut state = GraphState::new();
        let edge = ConceptEdge::new("a", "b").with_relation("r");
        let key = edge.key();
        state.insert_edge(edge.clone());

        assert!(state.remove_edge(&key));
        assert!(!state.contains_edge(&key));
        assert!(!state.remove_edge(&key));

        // Re-adding after removal works again
        assert!(state.insert_edge(edge));
        assert_eq!(state.edge_count(), 1);
    }

    #[test]
    fn from_parts_restores_invariants() {
        let state = GraphState::from_parts(
            vec![
                ConceptNode::new("a").with_salience(2.0),
                ConceptNode::new("b").with_salience(8.0),
                ConceptNode::new("a").with_summary("again"),
            ],
            vec![ConceptEdge::new("a", "b"), ConceptEdge::new("a", "b")],
        );

        assert_eq!(state.node_count(), 2);
        assert_eq!(state.edge_count(), 1);
        assert_eq!(state.get_node("a").unwrap().salience, Some(2.0));
        assert_eq!(state.get_node("a").unwrap().summary.as_deref(), Some("again"));
        assert_eq!(state.display_salience("a"), Some(1));
        assert_eq!(state.display_salience("b"), Some(10));
    }

    #[test]
    fn equality_ignores_display_salience() {
        let mut stale = GraphState::new();
        stale.upsert_node("a", &NodePatch::new());
        let mut fresh = stale.clone();
        fresh.refresh_display_salience();

        assert_eq!(stale, fresh);
    }
}
