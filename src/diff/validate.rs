//! Structural validation of extractor diffs
//!
//! Permissive by intent: a diff is rejected only when it is not an object,
//! has no `ops` array, or contains an entry that cannot be tagged. Unknown
//! tags and missing fields pass through as [`DiffOp::Unrecognized`] /
//! [`DiffOp::Malformed`] for the reducer to skip.

use super::op::DiffOp;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a whole diff was rejected
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("diff is not a JSON object")]
    NotAnObject,

    #[error("diff has no ops array")]
    OpsNotArray,

    #[error("op {index} has no type")]
    UntaggedOp { index: usize },

    #[error("diff is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DiffResult<T> = Result<T, DiffError>;

/// A validated batch of canonical ops, in wire order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    pub ops: Vec<DiffOp>,
}

impl Diff {
    pub fn new(ops: Vec<DiffOp>) -> Self {
        Self { ops }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Bring one wire entry into explicit-tag form.
///
/// An entry with a non-null `type` is tagged by it; a non-string tag keeps
/// its JSON text as the kind and ends up unrecognized. Otherwise an entry
/// with exactly one key whose value is an object is unwrapped:
/// `{"add_node": {"label": "x"}}` becomes `{"type": "add_node", "label": "x"}`.
/// Anything else has no tag.
pub fn normalize_op(raw: &Value) -> Option<(String, Map<String, Value>)> {
    let obj = raw.as_object()?;

    match obj.get("type") {
        None | Some(Value::Null) => {}
        Some(tag) => {
            let kind = match tag {
                Value::String(kind) => kind.clone(),
                other => other.to_string(),
            };
            let mut fields = obj.clone();
            fields.remove("type");
            return Some((kind, fields));
        }
    }

    if obj.len() != 1 {
        return None;
    }
    let (key, inner) = obj.iter().next()?;
    let inner = inner.as_object()?;
    Some((key.clone(), inner.clone()))
}

/// Validate and canonicalize a diff.
pub fn parse_diff(diff: &Value) -> DiffResult<Diff> {
    let obj = diff.as_object().ok_or(DiffError::NotAnObject)?;
    let entries = obj
        .get("ops")
        .and_then(Value::as_array)
        .ok_or(DiffError::OpsNotArray)?;

    let ops = entries
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            normalize_op(raw)
                .map(|(kind, fields)| DiffOp::from_tagged(&kind, &fields))
                .ok_or(DiffError::UntaggedOp { index })
        })
        .collect::<DiffResult<Vec<_>>>()?;

    Ok(Diff::new(ops))
}

/// Parse JSON text and validate it as a diff
pub fn parse_diff_str(text: &str) -> DiffResult<Diff> {
    let value: Value = serde_json::from_str(text)?;
    parse_diff(&value)
}

/// True if the diff is structurally acceptable
pub fn validate(diff: &Value) -> bool {
    parse_diff(diff).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConceptEdge, NodePatch};
    use serde_json::json;

    #[test]
    fn rejects_non_objects() {
        assert!(!validate(&json!([])));
        assert!(!validate(&json!("ops")));
        assert!(!validate(&Value::Null));
    }

    #[test]
    fn rejects_missing_or_non_array_ops() {
        assert!(!validate(&json!({})));
        assert!(!validate(&json!({ "ops": { "type": "add_node" } })));
        assert!(matches!(
            parse_diff(&json!({ "ops": "none" })),
            Err(DiffError::OpsNotArray)
        ));
    }

    #[test]
    fn accepts_empty_ops() {
        let diff = parse_diff(&json!({ "ops": [] })).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn wrapped_and_tagged_forms_normalize_identically() {
        let tagged = parse_diff(&json!({
            "ops": [{ "type": "add_edge", "sourceLabel": "a", "targetLabel": "b", "relation": "r" }]
        }))
        .unwrap();
        let wrapped = parse_diff(&json!({
            "ops": [{ "add_edge": { "sourceLabel": "a", "targetLabel": "b", "relation": "r" } }]
        }))
        .unwrap();

        assert_eq!(tagged, wrapped);
        assert_eq!(
            tagged.ops[0],
            DiffOp::add_edge(ConceptEdge::new("a", "b").with_relation("r"))
        );
    }

    #[test]
    fn explicit_type_takes_precedence_over_wrapping_key() {
        let (kind, fields) = normalize_op(&json!({
            "type": "update_node",
            "add_node": { "label": "y" }
        }))
        .unwrap();
        assert_eq!(kind, "update_node");
        assert_eq!(fields.get("add_node"), Some(&json!({ "label": "y" })));
        assert!(fields.get("type").is_none());

        let (kind, fields) =
            normalize_op(&json!({ "type": "update_node", "label": "x" })).unwrap();
        assert_eq!(kind, "update_node");
        assert_eq!(fields.get("label"), Some(&json!("x")));
    }

    #[test]
    fn non_string_type_is_unrecognized_not_untagged() {
        let diff = parse_diff(&json!({
            "ops": [
                { "type": "add_node", "label": "kayaking" },
                { "type": 7, "label": "weird" }
            ]
        }))
        .unwrap();
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.ops[0], DiffOp::add_node("kayaking", NodePatch::new()));
        assert_eq!(
            diff.ops[1],
            DiffOp::Unrecognized {
                kind: "7".to_string()
            }
        );

        let state = crate::graph::apply_ops(&crate::graph::GraphState::new(), &diff.ops);
        assert!(state.get_node("kayaking").is_some());
        assert_eq!(state.node_count(), 1);
    }

    #[test]
    fn null_type_counts_as_missing() {
        assert!(normalize_op(&json!({ "type": null })).is_none());
        assert!(!validate(&json!({ "ops": [{ "type": null, "label": "x" }] })));
    }

    #[test]
    fn untagged_entry_rejects_whole_diff() {
        let result = parse_diff(&json!({
            "ops": [
                { "type": "add_node", "label": "ok" },
                { "label": "no tag", "summary": "s" }
            ]
        }));
        assert!(matches!(result, Err(DiffError::UntaggedOp { index: 1 })));
    }

    #[test]
    fn non_object_entry_is_untagged() {
        assert!(!validate(&json!({ "ops": [42] })));
        assert!(!validate(&json!({ "ops": [{ "add_node": "x" }] })));
    }

    #[test]
    fn unknown_types_pass_validation() {
        let diff = parse_diff(&json!({
            "ops": [
                { "type": "rename_node", "from": "a", "to": "b" },
                { "type": "add_node", "label": "a" }
            ]
        }))
        .unwrap();
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.ops[0].kind(), "rename_node");
        assert_eq!(diff.ops[1], DiffOp::add_node("a", NodePatch::new()));
    }

    #[test]
    fn parse_diff_str_reports_bad_json() {
        assert!(matches!(parse_diff_str("{ops:"), Err(DiffError::Json(_))));
    }
}
