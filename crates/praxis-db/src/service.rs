//! Service layer orchestrating database mutations with audit.
//!
//! `PraxisService` wraps `PraxisDb` (raw database access). All repo methods
//! are implemented as `impl PraxisService` blocks under [`crate::repos`].

use crate::PraxisDb;
use crate::error::DatabaseError;

/// Orchestrates tenant-scoped database mutations with an audit trail.
///
/// Every mutation method follows this protocol:
/// 1. Check ownership (`user_id` filter) and application invariants
/// 2. Execute SQL, inside a transaction when more than one row changes
/// 3. Append an audit entry (inside the same transaction when there is one)
pub struct PraxisService {
    db: PraxisDb,
}

impl PraxisService {
    /// Open (and migrate) a local database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        let db = PraxisDb::open_local(db_path).await?;
        Ok(Self { db })
    }

    #[must_use]
    pub const fn from_db(db: PraxisDb) -> Self {
        Self { db }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &PraxisDb {
        &self.db
    }
}
