//! Typed audit detail payloads.
//!
//! Each audit action can carry a structured `detail` JSON blob. These types
//! give the common shapes a fixed layout.

use serde::{Deserialize, Serialize};

/// Detail for `AuditAction::Moved` on leads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovedDetail {
    pub from_pipeline: Option<String>,
    pub to_pipeline: String,
    pub position: i64,
}

/// Detail for `AuditAction::Converted`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConvertedDetail {
    pub patient_id: String,
}

/// Detail for `AuditAction::Unlocked` on referral rewards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlockedDetail {
    pub threshold: i64,
    pub referral_count: i64,
}

/// Detail for `AuditAction::SubscriptionChanged`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionChangedDetail {
    pub plan: String,
    pub status: String,
    pub event_type: String,
}

/// Detail for `AuditAction::Deleted` on pipelines (where leads went).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReassignedDetail {
    pub target_pipeline: String,
    pub leads_moved: u64,
}
