use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named Kanban column for leads. Each doctor has exactly one default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pipeline {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: Option<String>,
    pub position: i64,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
