//! Login sessions and password reset tokens.
//!
//! Only SHA-256 hashes of the bearer tokens are stored; the raw token is
//! known to the client alone.

use chrono::{DateTime, Utc};

use praxis_core::entities::AuthSession;
use praxis_core::enums::{AuditAction, EntityType};
use praxis_core::ids::{PREFIX_RESET_TOKEN, PREFIX_SESSION};

use crate::error::DatabaseError;
use crate::helpers::parse_datetime;
use crate::service::PraxisService;

fn row_to_session(row: &libsql::Row) -> Result<AuthSession, DatabaseError> {
    Ok(AuthSession {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        expires_at: parse_datetime(&row.get::<String>(2)?)?,
        created_at: parse_datetime(&row.get::<String>(3)?)?,
    })
}

impl PraxisService {
    pub async fn create_session(
        &self,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AuthSession, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_SESSION).await?;
        self.db()
            .execute(
                "INSERT INTO auth_sessions (id, user_id, token_hash, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                libsql::params![id.as_str(), user_id, token_hash, expires_at.to_rfc3339(), now.to_rfc3339()],
            )
            .await?;
        self.audit(user_id, EntityType::User, user_id, AuditAction::Login, None)
            .await?;
        Ok(AuthSession {
            id,
            user_id: user_id.to_string(),
            expires_at,
            created_at: now,
        })
    }

    /// Look up a live session. Expired sessions are reported as `NoResult`.
    pub async fn get_session_by_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthSession, DatabaseError> {
        let mut rows = self
            .db()
            .query(
                "SELECT id, user_id, expires_at, created_at FROM auth_sessions WHERE token_hash = ?1",
                [token_hash],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let session = row_to_session(&row)?;
        if session.expires_at <= now {
            return Err(DatabaseError::NoResult);
        }
        Ok(session)
    }

    pub async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<(), DatabaseError> {
        let affected = self
            .db()
            .execute(
                "DELETE FROM auth_sessions WHERE id = ?1 AND user_id = ?2",
                [session_id, user_id],
            )
            .await?;
        crate::helpers::ensure_affected(affected)?;
        self.audit(user_id, EntityType::User, user_id, AuditAction::Logout, None)
            .await
    }

    /// Revoke every session of a user (after a password reset).
    pub async fn delete_sessions_for_user(&self, user_id: &str) -> Result<u64, DatabaseError> {
        self.db()
            .execute("DELETE FROM auth_sessions WHERE user_id = ?1", [user_id])
            .await
    }

    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let purged = self
            .db()
            .execute(
                "DELETE FROM auth_sessions WHERE expires_at <= ?1",
                [now.to_rfc3339()],
            )
            .await?;
        if purged > 0 {
            tracing::debug!(purged, "expired sessions removed");
        }
        Ok(purged)
    }

    pub async fn create_reset_token(
        &self,
        user_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let id = self.db().generate_id(PREFIX_RESET_TOKEN).await?;
        self.db()
            .execute(
                "INSERT INTO password_resets (id, user_id, token_hash, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                libsql::params![id.as_str(), user_id, token_hash, expires_at.to_rfc3339(), Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Mark a reset token used and return its user id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` for unknown, used or expired tokens.
    pub async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<String, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<String, DatabaseError> = async {
            let mut rows = tx
                .query(
                    "SELECT id, user_id, expires_at FROM password_resets
                     WHERE token_hash = ?1 AND used_at IS NULL",
                    [token_hash],
                )
                .await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            let id = row.get::<String>(0)?;
            let user_id = row.get::<String>(1)?;
            if parse_datetime(&row.get::<String>(2)?)? <= now {
                return Err(DatabaseError::NoResult);
            }
            tx.execute(
                "UPDATE password_resets SET used_at = ?1 WHERE id = ?2",
                libsql::params![now.to_rfc3339(), id.as_str()],
            )
            .await?;
            Ok(user_id)
        }
        .await;
        tx.finish(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::service_with_user;
    use chrono::Duration;

    #[tokio::test]
    async fn session_lookup_by_hash() {
        let (svc, user_id) = service_with_user().await;
        let expires = Utc::now() + Duration::hours(1);
        let session = svc.create_session(&user_id, "hash-1", expires).await.unwrap();

        let found = svc.get_session_by_token_hash("hash-1", Utc::now()).await.unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.user_id, user_id);
    }

    #[tokio::test]
    async fn expired_session_is_not_found() {
        let (svc, user_id) = service_with_user().await;
        svc.create_session(&user_id, "hash-1", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        let err = svc.get_session_by_token_hash("hash-1", Utc::now()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NoResult));

        assert_eq!(svc.purge_expired_sessions(Utc::now()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn logout_deletes_only_own_session() {
        let (svc, user_id) = service_with_user().await;
        let session = svc
            .create_session(&user_id, "hash-1", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert!(matches!(
            svc.delete_session("usr-other", &session.id).await,
            Err(DatabaseError::NoResult)
        ));
        svc.delete_session(&user_id, &session.id).await.unwrap();
        assert!(svc.get_session_by_token_hash("hash-1", Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let (svc, user_id) = service_with_user().await;
        let now = Utc::now();
        svc.create_reset_token(&user_id, "reset-1", now + Duration::minutes(30))
            .await
            .unwrap();

        let consumed = svc.consume_reset_token("reset-1", now).await.unwrap();
        assert_eq!(consumed, user_id);
        assert!(matches!(
            svc.consume_reset_token("reset-1", now).await,
            Err(DatabaseError::NoResult)
        ));
    }

    #[tokio::test]
    async fn expired_reset_token_rejected() {
        let (svc, user_id) = service_with_user().await;
        let now = Utc::now();
        svc.create_reset_token(&user_id, "reset-1", now - Duration::minutes(1))
            .await
            .unwrap();
        assert!(svc.consume_reset_token("reset-1", now).await.is_err());
    }

    #[tokio::test]
    async fn revoke_all_sessions() {
        let (svc, user_id) = service_with_user().await;
        let expires = Utc::now() + Duration::hours(1);
        svc.create_session(&user_id, "a", expires).await.unwrap();
        svc.create_session(&user_id, "b", expires).await.unwrap();
        assert_eq!(svc.delete_sessions_for_user(&user_id).await.unwrap(), 2);
    }
}
