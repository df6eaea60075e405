//! Chatbot flow graphs: validation of editor drafts and traversal.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::entities::{ChatbotEdge, ChatbotNode};
use crate::enums::{ChatbotNodeKind, LeadField};
use crate::errors::CoreError;

/// Node as sent by the flow editor. `key` is a client-side identifier that
/// edges refer to; the database assigns the real id on save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDraft {
    pub key: String,
    pub kind: ChatbotNodeKind,
    pub text: String,
    #[serde(default)]
    pub field: Option<LeadField>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeDraft {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Check an editor draft before it replaces the stored graph.
///
/// # Errors
///
/// Returns `CoreError::Validation` for duplicate node keys, more than one
/// start node, input nodes without a lead field, self loops, or edges that
/// point at unknown nodes.
pub fn validate_graph(nodes: &[NodeDraft], edges: &[EdgeDraft]) -> Result<(), CoreError> {
    let mut keys = HashSet::new();
    for node in nodes {
        if !keys.insert(node.key.as_str()) {
            return Err(CoreError::Validation(format!("duplicate node key '{}'", node.key)));
        }
        if node.kind == ChatbotNodeKind::Input && node.field.is_none() {
            return Err(CoreError::Validation(format!(
                "input node '{}' must name a lead field",
                node.key
            )));
        }
    }

    let starts = nodes.iter().filter(|n| n.kind == ChatbotNodeKind::Start).count();
    if starts > 1 {
        return Err(CoreError::Validation("flow has more than one start node".into()));
    }

    for edge in edges {
        if !keys.contains(edge.source.as_str()) || !keys.contains(edge.target.as_str()) {
            return Err(CoreError::Validation(format!(
                "edge {} -> {} references an unknown node",
                edge.source, edge.target
            )));
        }
        if edge.source == edge.target {
            return Err(CoreError::Validation(format!("node '{}' links to itself", edge.source)));
        }
    }
    Ok(())
}

/// Entry node: the `start` node, else the first node.
#[must_use]
pub fn entry_node(nodes: &[ChatbotNode]) -> Option<&ChatbotNode> {
    nodes
        .iter()
        .find(|n| n.kind == ChatbotNodeKind::Start)
        .or_else(|| nodes.first())
}

/// Node reached from `current` given the visitor's `answer`.
///
/// A labelled edge whose label matches the answer (trimmed, case-insensitive)
/// wins; otherwise the first unlabelled edge is followed. `None` ends the
/// conversation.
#[must_use]
pub fn next_node<'a>(
    nodes: &'a [ChatbotNode],
    edges: &[ChatbotEdge],
    current: &str,
    answer: Option<&str>,
) -> Option<&'a ChatbotNode> {
    let outgoing: Vec<&ChatbotEdge> = edges.iter().filter(|e| e.source_node_id == current).collect();
    let answer = answer.map(|a| a.trim().to_lowercase());

    let matched = answer.as_deref().and_then(|ans| {
        outgoing.iter().find(|e| {
            e.label
                .as_deref()
                .is_some_and(|label| label.trim().to_lowercase() == ans)
        })
    });
    let edge = matched.or_else(|| outgoing.iter().find(|e| e.label.is_none()))?;

    nodes.iter().find(|n| n.id == edge.target_node_id)
}

/// One answered step of a chatbot conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub node_id: String,
    pub prompt: String,
    pub answer: String,
}

/// Lead attributes and transcript gathered from a finished conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capture {
    pub fields: BTreeMap<LeadField, String>,
    pub transcript: Vec<TranscriptEntry>,
}

impl Capture {
    #[must_use]
    pub fn field(&self, field: LeadField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }
}

/// Pair the visitor's answers (keyed by node id) with the flow's nodes.
///
/// Answers to `input` nodes fill the node's lead field; every non-blank
/// answer to a known node is kept in the transcript, in node order.
#[must_use]
pub fn collect_answers(nodes: &[ChatbotNode], answers: &BTreeMap<String, String>) -> Capture {
    let mut capture = Capture::default();
    for node in nodes {
        let Some(answer) = answers.get(&node.id).map(|a| a.trim()).filter(|a| !a.is_empty()) else {
            continue;
        };
        if node.kind == ChatbotNodeKind::Input {
            if let Some(field) = node.field {
                capture.fields.insert(field, answer.to_string());
            }
        }
        capture.transcript.push(TranscriptEntry {
            node_id: node.id.clone(),
            prompt: node.text.clone(),
            answer: answer.to_string(),
        });
    }
    capture
}
