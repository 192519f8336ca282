//! Diff payload builders
//!
//! Builds the JSON an extractor would answer with.

use serde_json::{json, Value};

/// The diff from the "weekend kayaking" conversation
pub const KAYAKING_DIFF: &str = r#"{"ops":[{"type":"add_node","label":"kayaking","salience":7},{"type":"add_edge","sourceLabel":"kayaking","targetLabel":"weekend trip","relation":"part_of"}]}"#;

pub fn add_node(label: &str, salience: f64) -> Value {
    json!({ "type": "add_node", "label": label, "salience": salience })
}

pub fn update_node(label: &str, summary: &str) -> Value {
    json!({ "type": "update_node", "label": label, "summary": summary })
}

pub fn add_edge(source: &str, target: &str, relation: &str) -> Value {
    json!({ "type": "add_edge", "sourceLabel": source, "targetLabel": target, "relation": relation })
}

pub fn remove_edge(source: &str, target: &str, relation: &str) -> Value {
    json!({ "type": "remove_edge", "sourceLabel": source, "targetLabel": target, "relation": relation })
}

/// Wrap ops into the JSON text of a diff
pub fn diff(ops: Vec<Value>) -> String {
    json!({ "ops": ops }).to_string()
}
