//! Conversation window: finalized transcript turns and the extractor prompt

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Turns kept in memory; older ones can never enter a window anyway
const MAX_RETAINED_TURNS: usize = 256;

const EXTRACTOR_PROMPT: &str = r#"You are a concept extractor. Return ONLY a JSON object with an "ops" array; no prose, no audio. Each op is an OBJECT with a "type" field where type is one of add_node, update_node, add_edge, remove_edge.

For type=add_node or update_node, include: {"type": "add_node|update_node", "label": string, "summary"?: string, "keywords"?: string[], "salience"?: number 1-10}.
For type=add_edge, include: {"type": "add_edge", "sourceLabel": string, "targetLabel": string, "relation"?: string, "confidence"?: number 0-1}.
For type=remove_edge, include: {"type": "remove_edge", "sourceLabel": string, "targetLabel": string, "relation"?: string}.

Analyze the conversation (most recent last) and produce minimal diffs strictly in this flat format. Conversation follows:

"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Transcript entries that are conversation vs. client-side annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Message,
    Breadcrumb,
}

/// A finalized transcript item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptTurn {
    pub item_id: String,
    pub role: Role,
    pub text: String,
    pub kind: TurnKind,
}

impl TranscriptTurn {
    pub fn message(item_id: impl Into<String>, role: Role, text: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            role,
            text: text.into(),
            kind: TurnKind::Message,
        }
    }

    pub fn breadcrumb(item_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            role: Role::Assistant,
            text: text.into(),
            kind: TurnKind::Breadcrumb,
        }
    }
}

/// Finalized turns in arrival order
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: VecDeque<TranscriptTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a turn. A turn re-finalized under the same item id replaces
    /// the earlier text in place. Returns true for a new item.
    pub fn record(&mut self, turn: TranscriptTurn) -> bool {
        if let Some(existing) = self.turns.iter_mut().find(|t| t.item_id == turn.item_id) {
            *existing = turn;
            return false;
        }
        self.turns.push_back(turn);
        if self.turns.len() > MAX_RETAINED_TURNS {
            self.turns.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The last `max_turns` message turns as `role: text` lines
    pub fn window(&self, max_turns: usize) -> String {
        let messages: Vec<&TranscriptTurn> = self
            .turns
            .iter()
            .filter(|t| t.kind == TurnKind::Message)
            .collect();
        let start = messages.len().saturating_sub(max_turns);
        messages[start..]
            .iter()
            .map(|t| format!("{}: {}", t.role, t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Extractor instructions with the conversation window appended
pub fn render_instructions(window: &str) -> String {
    format!("{}{}", EXTRACTOR_PROMPT, window)
}
