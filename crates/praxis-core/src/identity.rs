use serde::{Deserialize, Serialize};

use crate::enums::Plan;

/// Authenticated doctor identity for cross-crate passing.
///
/// Produced by the session extractor in `praxis-server`, consumed by every
/// tenant-scoped repository call. Contains only data fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantIdentity {
    /// Owning user id (`usr-...`). Every tenant row carries it.
    pub user_id: String,
    pub email: String,
    pub plan: Plan,
    /// Session the request was authenticated with.
    pub session_id: String,
}
