//! Calendar OAuth credentials and pending OAuth `state` values.

use chrono::{DateTime, Utc};

use praxis_core::entities::CalendarCredentials;
use praxis_core::enums::{AuditAction, EntityType};
use praxis_core::ids::PREFIX_OAUTH_STATE;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime};
use crate::service::PraxisService;

impl PraxisService {
    /// Insert or replace the calendar tokens of a user.
    ///
    /// A refresh without a new refresh token keeps the stored one.
    pub async fn save_calendar_credentials(
        &self,
        creds: &CalendarCredentials,
    ) -> Result<(), DatabaseError> {
        self.db()
            .execute(
                "INSERT INTO calendar_credentials (user_id, access_token, refresh_token, expires_at, scope, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_id) DO UPDATE SET
                    access_token = excluded.access_token,
                    refresh_token = COALESCE(excluded.refresh_token, calendar_credentials.refresh_token),
                    expires_at = excluded.expires_at,
                    scope = COALESCE(excluded.scope, calendar_credentials.scope),
                    updated_at = excluded.updated_at",
                libsql::params![
                    creds.user_id.as_str(),
                    creds.access_token.as_str(),
                    creds.refresh_token.as_deref(),
                    creds.expires_at.to_rfc3339(),
                    creds.scope.as_deref(),
                    creds.updated_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn get_calendar_credentials(
        &self,
        user_id: &str,
    ) -> Result<CalendarCredentials, DatabaseError> {
        let mut rows = self
            .db()
            .query(
                "SELECT user_id, access_token, refresh_token, expires_at, scope, updated_at
                 FROM calendar_credentials WHERE user_id = ?1",
                [user_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(CalendarCredentials {
            user_id: row.get::<String>(0)?,
            access_token: row.get::<String>(1)?,
            refresh_token: get_opt_string(&row, 2)?,
            expires_at: parse_datetime(&row.get::<String>(3)?)?,
            scope: get_opt_string(&row, 4)?,
            updated_at: parse_datetime(&row.get::<String>(5)?)?,
        })
    }

    pub async fn delete_calendar_credentials(&self, user_id: &str) -> Result<(), DatabaseError> {
        let affected = self
            .db()
            .execute("DELETE FROM calendar_credentials WHERE user_id = ?1", [user_id])
            .await?;
        crate::helpers::ensure_affected(affected)?;
        self.audit(
            user_id,
            EntityType::User,
            user_id,
            AuditAction::Updated,
            Some(serde_json::json!({"calendar": "disconnected"})),
        )
        .await
    }

    pub async fn create_oauth_state(
        &self,
        user_id: &str,
        state: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let id = self.db().generate_id(PREFIX_OAUTH_STATE).await?;
        self.db()
            .execute(
                "INSERT INTO oauth_states (id, user_id, state, expires_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                libsql::params![id.as_str(), user_id, state, expires_at.to_rfc3339(), Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Delete a pending state and return the user that started the flow.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` for unknown or expired states.
    pub async fn consume_oauth_state(
        &self,
        state: &str,
        now: DateTime<Utc>,
    ) -> Result<String, DatabaseError> {
        let mut rows = self
            .db()
            .query(
                "SELECT user_id, expires_at FROM oauth_states WHERE state = ?1",
                [state],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let user_id = row.get::<String>(0)?;
        let expires_at = parse_datetime(&row.get::<String>(1)?)?;

        let deleted = self
            .db()
            .execute("DELETE FROM oauth_states WHERE state = ?1", [state])
            .await?;
        // A concurrent callback may have consumed it first.
        crate::helpers::ensure_affected(deleted)?;
        if expires_at <= now {
            return Err(DatabaseError::NoResult);
        }
        Ok(user_id)
    }
}
