//! Canonical diff operations
//!
//! Wire entries are converted here once; everything past the validator
//! sees only [`DiffOp`].

use crate::graph::{ConceptEdge, EdgeKey, NodePatch};
use serde_json::{Map, Value};

pub const ADD_NODE: &str = "add_node";
pub const UPDATE_NODE: &str = "update_node";
pub const ADD_EDGE: &str = "add_edge";
pub const REMOVE_EDGE: &str = "remove_edge";

/// One graph edit.
///
/// `Unrecognized` and `Malformed` survive validation on purpose: the
/// reducer skips them individually so one bad op never costs the batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOp {
    AddNode { label: String, patch: NodePatch },
    UpdateNode { label: String, patch: NodePatch },
    AddEdge(ConceptEdge),
    RemoveEdge(EdgeKey),
    /// Tag the reducer does not know
    Unrecognized { kind: String },
    /// Known tag with a required field missing or of the wrong type
    Malformed { kind: String, field: &'static str },
}

impl DiffOp {
    pub fn add_node(label: impl Into<String>, patch: NodePatch) -> Self {
        Self::AddNode {
            label: label.into(),
            patch,
        }
    }

    pub fn update_node(label: impl Into<String>, patch: NodePatch) -> Self {
        Self::UpdateNode {
            label: label.into(),
            patch,
        }
    }

    pub fn add_edge(edge: ConceptEdge) -> Self {
        Self::AddEdge(edge)
    }

    pub fn remove_edge(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: Option<&str>,
    ) -> Self {
        Self::RemoveEdge(EdgeKey::new(source, target, relation))
    }

    /// The wire tag of this op
    pub fn kind(&self) -> &str {
        match self {
            Self::AddNode { .. } => ADD_NODE,
            Self::UpdateNode { .. } => UPDATE_NODE,
            Self::AddEdge(_) => ADD_EDGE,
            Self::RemoveEdge(_) => REMOVE_EDGE,
            Self::Unrecognized { kind } | Self::Malformed { kind, .. } => kind,
        }
    }

    /// Build an op from its tag and the remaining (already spliced) fields.
    pub fn from_tagged(kind: &str, fields: &Map<String, Value>) -> Self {
        let malformed = |field| Self::Malformed {
            kind: kind.to_string(),
            field,
        };

        match kind {
            ADD_NODE | UPDATE_NODE => {
                let Some(label) = required_str(fields, "label") else {
                    return malformed("label");
                };
                let patch = node_patch(fields);
                if kind == ADD_NODE {
                    Self::add_node(label, patch)
                } else {
                    Self::update_node(label, patch)
                }
            }
            ADD_EDGE | REMOVE_EDGE => {
                let Some(source) = required_str(fields, "sourceLabel") else {
                    return malformed("sourceLabel");
                };
                let Some(target) = required_str(fields, "targetLabel") else {
                    return malformed("targetLabel");
                };
                let relation = optional_str(fields, "relation");
                if kind == REMOVE_EDGE {
                    return Self::remove_edge(source, target, relation.as_deref());
                }
                let mut edge = ConceptEdge::new(source, target);
                edge.relation = relation;
                edge.confidence = fields.get("confidence").and_then(Value::as_f64);
                Self::AddEdge(edge)
            }
            other => Self::Unrecognized {
                kind: other.to_string(),
            },
        }
    }
}

fn required_str(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn optional_str(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Optional node attributes; wrong-typed values count as absent.
fn node_patch(fields: &Map<String, Value>) -> NodePatch {
    NodePatch {
        summary: optional_str(fields, "summary"),
        keywords: fields.get("keywords").and_then(Value::as_array).map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        }),
        salience: fields.get("salience").and_then(Value::as_f64),
    }
}
