//! Idempotency ledger for payment webhooks.

use crate::error::DatabaseError;
use crate::service::PraxisService;

impl PraxisService {
    /// Record a provider event id. Returns `false` if it was already seen.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn mark_webhook_processed(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<bool, DatabaseError> {
        let inserted = self
            .db()
            .execute(
                "INSERT OR IGNORE INTO webhook_events (event_id, event_type, received_at)
                 VALUES (?1, ?2, ?3)",
                libsql::params![event_id, event_type, chrono::Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(inserted == 1)
    }

    /// Drop a recorded event id so a redelivery is applied again.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the DELETE fails.
    pub async fn forget_webhook_event(&self, event_id: &str) -> Result<(), DatabaseError> {
        self.db()
            .execute("DELETE FROM webhook_events WHERE event_id = ?1", [event_id])
            .await?;
        Ok(())
    }
}
