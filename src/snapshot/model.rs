//! Persisted form of a workspace graph

use crate::graph::{ConceptEdge, ConceptNode, GraphState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// Current snapshot layout
pub const SCHEMA_VERSION: u32 = 1;

const NODE_ID_PREFIX: &str = "n_";
const EDGE_ID_PREFIX: &str = "e_";

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// A saved workspace graph. Display salience is derived and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub workspace_key: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salience: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// What the store reports after a save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    pub etag: String,
    /// Serialized size in bytes
    pub size: usize,
}

/// Stable id of the node labelled `label`
pub fn node_id(label: &str) -> String {
    format!("{}{}", NODE_ID_PREFIX, urlencoding::encode(label))
}

fn edge_id(edge: &ConceptEdge, index: usize) -> String {
    format!(
        "{}{}{}{}{}",
        EDGE_ID_PREFIX,
        urlencoding::encode(&edge.source_label),
        urlencoding::encode(&edge.target_label),
        urlencoding::encode(edge.relation.as_deref().unwrap_or_default()),
        index
    )
}

/// Label for a node id with no node in the snapshot (a dangling endpoint).
fn label_from_id(id: &str) -> String {
    let encoded = id.strip_prefix(NODE_ID_PREFIX).unwrap_or(id);
    urlencoding::decode(encoded)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| encoded.to_string())
}

/// Snapshot of `state` for `workspace_key`, stamped now
pub fn serialize(state: &GraphState, workspace_key: &str) -> Snapshot {
    let nodes = state
        .nodes()
        .map(|node| SnapshotNode {
            id: node_id(&node.label),
            label: node.label.clone(),
            summary: node.summary.clone(),
            keywords: node.keywords.clone(),
            salience: node.salience,
        })
        .collect();

    let edges = state
        .edges()
        .enumerate()
        .map(|(index, edge)| SnapshotEdge {
            id: edge_id(edge, index),
            source_id: node_id(&edge.source_label),
            target_id: node_id(&edge.target_label),
            relation: edge.relation.clone(),
            confidence: edge.confidence,
        })
        .collect();

    Snapshot {
        schema_version: SCHEMA_VERSION,
        workspace_key: workspace_key.to_string(),
        updated_at: Utc::now(),
        nodes,
        edges,
    }
}

/// Rebuild a graph from a snapshot.
///
/// Edge endpoints are resolved through the snapshot's own node ids; ids with
/// no node are decoded back into labels, so dangling edges survive.
pub fn hydrate(snapshot: &Snapshot) -> GraphState {
    let labels: HashMap<&str, &str> = snapshot
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.label.as_str()))
        .collect();
    let resolve = |id: &str| -> String {
        labels
            .get(id)
            .map(|label| label.to_string())
            .unwrap_or_else(|| label_from_id(id))
    };

    let nodes = snapshot.nodes.iter().map(|n| ConceptNode {
        label: n.label.clone(),
        summary: n.summary.clone(),
        keywords: n.keywords.clone(),
        salience: n.salience,
    });

    let edges = snapshot.edges.iter().map(|e| ConceptEdge {
        source_label: resolve(&e.source_id),
        target_label: resolve(&e.target_id),
        relation: e.relation.clone(),
        confidence: e.confidence,
    });

    GraphState::from_parts(nodes, edges)
}
