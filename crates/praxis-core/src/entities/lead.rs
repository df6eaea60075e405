use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{LeadSource, LeadStatus};

/// A prospective patient captured via a form, chatbot, quiz, indication,
/// referral, or entered manually.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub id: String,
    pub user_id: String,
    pub pipeline_id: Option<String>,
    /// Set once the lead is converted.
    pub patient_id: Option<String>,
    pub indication_id: Option<String>,
    pub page_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub interest: Option<String>,
    pub notes: Option<String>,
    pub source: LeadSource,
    pub status: LeadStatus,
    /// Order inside the pipeline column (0-based).
    pub position: i64,
    /// Capture-specific payload (processed quiz answers, chatbot transcript).
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
