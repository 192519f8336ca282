//! Labelled relations between concepts

use serde::{Deserialize, Serialize};

/// Identity of an edge: `(source, target, relation or "")`.
///
/// Two edges with the same key are the same edge; confidence is not part
/// of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub relation: String,
}

impl EdgeKey {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: Option<&str>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.unwrap_or_default().to_string(),
        }
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}→{}#{}", self.source, self.target, self.relation)
    }
}

/// A directed relation between two labels.
///
/// Endpoints are labels, not node references: an edge may point at a label
/// that has no node (yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptEdge {
    pub source_label: String,
    pub target_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    /// Extractor's certainty, nominally 0-1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ConceptEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_label: source.into(),
            target_label: target.into(),
            relation: None,
            confidence: None,
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Identity key of this edge
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(
            self.source_label.as_str(),
            self.target_label.as_str(),
            self.relation.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_relation_keys_like_empty_relation() {
        let bare = ConceptEdge::new("a", "b");
        let empty = ConceptEdge::new("a", "b").with_relation("");
        assert_eq!(bare.key(), empty.key());
    }

    #[test]
    fn confidence_is_not_part_of_identity() {
        let low = ConceptEdge::new("a", "b").with_relation("likes").with_confidence(0.1);
        let high = ConceptEdge::new("a", "b").with_relation("likes").with_confidence(0.9);
        assert_eq!(low.key(), high.key());
    }

    #[test]
    fn key_displays_as_arrow_form() {
        let key = EdgeKey::new("kayaking", "weekend trip", Some("part_of"));
        assert_eq!(key.to_string(), "kayaking→weekend trip#part_of");
    }

    #[test]
    fn edge_serializes_camel_case() {
        let json = serde_json::to_value(ConceptEdge::new("a", "b").with_relation("r")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "sourceLabel": "a", "targetLabel": "b", "relation": "r" })
        );
    }
}
