use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A trackable referral link belonging to a doctor (`/i/{slug}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Indication {
    pub id: String,
    pub user_id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    /// Redirect destination; `None` sends visitors to the doctor's page.
    pub target_url: Option<String>,
    pub clicks: i64,
    pub leads_count: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
