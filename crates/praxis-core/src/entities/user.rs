use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Plan, SubscriptionStatus};

/// A doctor account. Every tenant-owned row points back to one of these.
///
/// The password hash is deliberately not part of the entity; it is read
/// through a dedicated repository call during login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    /// Public handle, unique across all users.
    pub slug: String,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub plan: Plan,
    pub subscription_status: SubscriptionStatus,
    pub payment_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
