use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{ClinicStatus, OutboundChannel};

/// A clinic the doctor is prospecting for partnerships or referrals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Clinic {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub specialty: Option<String>,
    pub notes: Option<String>,
    pub status: ClinicStatus,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One outbound contact attempt with a clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outbound {
    pub id: String,
    pub user_id: String,
    pub clinic_id: String,
    pub channel: OutboundChannel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
