use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One patient-to-patient referral registered through a referral code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientReferral {
    pub id: String,
    pub user_id: String,
    pub referrer_patient_id: String,
    /// Lead created for the referred person.
    pub lead_id: Option<String>,
    pub referred_name: String,
    pub referred_email: Option<String>,
    pub referred_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A reward a patient unlocks after `threshold` referrals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferralReward {
    pub id: String,
    pub user_id: String,
    pub patient_id: String,
    pub title: String,
    pub description: Option<String>,
    pub threshold: i64,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
