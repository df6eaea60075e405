use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{ChatbotNodeKind, LeadField};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatbotFlow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatbotNode {
    pub id: String,
    pub flow_id: String,
    pub kind: ChatbotNodeKind,
    pub text: String,
    /// Lead attribute captured by `input` nodes.
    pub field: Option<LeadField>,
    /// Quick-reply options for `question` nodes.
    pub options: Vec<String>,
    pub position_x: f64,
    pub position_y: f64,
}

/// Directed edge. A labelled edge is followed when the visitor's answer
/// matches the label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatbotEdge {
    pub id: String,
    pub flow_id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatbotGraph {
    pub flow: ChatbotFlow,
    pub nodes: Vec<ChatbotNode>,
    pub edges: Vec<ChatbotEdge>,
}
