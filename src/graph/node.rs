//! Concept nodes, keyed by label

use serde::{Deserialize, Serialize};

/// A concept in the live graph.
///
/// The label is the node's identity: there is no surrogate id in the live
/// graph, and labels compare exactly (case-sensitive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    /// Unique key
    pub label: String,
    /// One-line description supplied by the extractor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Free-form keywords
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    /// Author-assigned importance, nominally 1-10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salience: Option<f64>,
}

impl ConceptNode {
    /// Create a node carrying only its label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            summary: None,
            keywords: None,
            salience: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_salience(mut self, salience: f64) -> Self {
        self.salience = Some(salience);
        self
    }

    /// Overlay every field the patch carries; absent fields keep their value.
    pub fn merge(&mut self, patch: &NodePatch) {
        if let Some(summary) = &patch.summary {
            self.summary = Some(summary.clone());
        }
        if let Some(keywords) = &patch.keywords {
            self.keywords = Some(keywords.clone());
        }
        if let Some(salience) = patch.salience {
            self.salience = Some(salience);
        }
    }
}

/// The optional attributes an `add_node`/`update_node` op carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub summary: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub salience: Option<f64>,
}

impl NodePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_salience(mut self, salience: f64) -> Self {
        self.salience = Some(salience);
        self
    }

    /// True if the patch would not change any node
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.keywords.is_none() && self.salience.is_none()
    }
}
