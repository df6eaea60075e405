use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::EventKind;

/// An analytics event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub user_id: String,
    pub kind: EventKind,
    pub page_id: Option<String>,
    pub indication_id: Option<String>,
    pub lead_id: Option<String>,
    pub path: Option<String>,
    pub referrer: Option<String>,
    /// Opaque per-visitor fingerprint (hash), used for unique counts.
    pub visitor_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
