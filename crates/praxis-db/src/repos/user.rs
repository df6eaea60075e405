//! Doctor accounts: registration, profile, credentials and subscription.

use chrono::Utc;
use serde::Deserialize;

use praxis_core::audit_detail::SubscriptionChangedDetail;
use praxis_core::entities::User;
use praxis_core::enums::{AuditAction, EntityType, Plan, SubscriptionStatus};
use praxis_core::ids::{PREFIX_PIPELINE, PREFIX_USER};
use praxis_core::slug;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum};
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::user::UserUpdate;

const SELECT_COLS: &str = "id, email, name, slug, specialty, phone, avatar_url, plan, subscription_status, payment_customer_id, created_at, updated_at";

/// Name of the pipeline every new account starts with.
pub const DEFAULT_PIPELINE_NAME: &str = "New leads";

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    /// PHC string produced by the password hasher.
    pub password_hash: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn row_to_user(row: &libsql::Row) -> Result<User, DatabaseError> {
    Ok(User {
        id: row.get::<String>(0)?,
        email: row.get::<String>(1)?,
        name: row.get::<String>(2)?,
        slug: row.get::<String>(3)?,
        specialty: get_opt_string(row, 4)?,
        phone: get_opt_string(row, 5)?,
        avatar_url: get_opt_string(row, 6)?,
        plan: parse_enum(&row.get::<String>(7)?)?,
        subscription_status: parse_enum(&row.get::<String>(8)?)?,
        payment_customer_id: get_opt_string(row, 9)?,
        created_at: parse_datetime(&row.get::<String>(10)?)?,
        updated_at: parse_datetime(&row.get::<String>(11)?)?,
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl PraxisService {
    /// Register a doctor together with their default pipeline.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` for a blank name, malformed email or
    /// bad slug, and `DatabaseError::Conflict` when email or slug is taken.
    pub async fn create_user(&self, new: &NewUser) -> Result<User, DatabaseError> {
        let email = normalize_email(&new.email);
        let name = new.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("name is required".into()));
        }
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(DatabaseError::Validation(format!("invalid email '{email}'")));
        }
        let slug = match new.slug.as_deref() {
            Some(s) => s.trim().to_string(),
            None => slug::slugify(name),
        };
        slug::validate(&slug)?;

        if self.email_taken(&email).await? {
            return Err(DatabaseError::Conflict(format!("email '{email}' is already registered")));
        }
        if self.user_slug_taken(&slug, None).await? {
            return Err(DatabaseError::Conflict(format!("slug '{slug}' is already taken")));
        }

        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_USER).await?;
        let pipeline_id = self.db().generate_id(PREFIX_PIPELINE).await?;

        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            tx.execute(
                "INSERT INTO users (id, email, name, slug, password_hash, specialty, phone, plan, subscription_status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                libsql::params![
                    id.as_str(),
                    email.as_str(),
                    name,
                    slug.as_str(),
                    new.password_hash.as_str(),
                    new.specialty.as_deref(),
                    new.phone.as_deref(),
                    Plan::Free.as_str(),
                    SubscriptionStatus::Inactive.as_str(),
                    now.to_rfc3339()
                ],
            )
            .await?;
            tx.execute(
                "INSERT INTO pipelines (id, user_id, name, position, is_default, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, 1, ?4, ?4)",
                libsql::params![pipeline_id.as_str(), id.as_str(), DEFAULT_PIPELINE_NAME, now.to_rfc3339()],
            )
            .await?;
            self.audit_in(&tx, &id, EntityType::User, &id, AuditAction::Created, None)
                .await?;
            self.audit_in(&tx, &id, EntityType::Pipeline, &pipeline_id, AuditAction::Created, None)
                .await?;
            Ok(())
        }
        .await;
        tx.finish(result).await?;

        tracing::info!(user_id = %id, "user registered");
        self.get_user(&id).await
    }

    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM users WHERE id = ?1");
        let mut rows = self.db().query(&sql, [id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_user(&row)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM users WHERE email = ?1");
        let mut rows = self.db().query(&sql, [normalize_email(email)]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_user(&row)
    }

    pub async fn get_user_by_slug(&self, slug: &str) -> Result<User, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM users WHERE slug = ?1");
        let mut rows = self.db().query(&sql, [slug]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_user(&row)
    }

    pub async fn get_user_by_customer_id(&self, customer_id: &str) -> Result<User, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM users WHERE payment_customer_id = ?1");
        let mut rows = self.db().query(&sql, [customer_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_user(&row)
    }

    /// User and stored password hash for a login attempt.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` for unknown emails.
    pub async fn get_login(&self, email: &str) -> Result<(User, String), DatabaseError> {
        let user = self.get_user_by_email(email).await?;
        let mut rows = self
            .db()
            .query("SELECT password_hash FROM users WHERE id = ?1", [user.id.as_str()])
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok((user, row.get::<String>(0)?))
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::Validation`/`Conflict` for a bad or taken slug.
    pub async fn update_user(&self, id: &str, update: UserUpdate) -> Result<User, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref name) = update.name {
            if name.trim().is_empty() {
                return Err(DatabaseError::Validation("name is required".into()));
            }
            sets.set("name", name.trim());
        }
        if let Some(ref new_slug) = update.slug {
            slug::validate(new_slug)?;
            if self.user_slug_taken(new_slug, Some(id)).await? {
                return Err(DatabaseError::Conflict(format!("slug '{new_slug}' is already taken")));
            }
            sets.set("slug", new_slug.as_str());
        }
        if let Some(ref specialty) = update.specialty {
            sets.set_opt("specialty", specialty.as_deref());
        }
        if let Some(ref phone) = update.phone {
            sets.set_opt("phone", phone.as_deref());
        }
        if let Some(ref avatar_url) = update.avatar_url {
            sets.set_opt("avatar_url", avatar_url.as_deref());
        }

        if sets.is_empty() {
            return self.get_user(id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("users", id, None);
        let affected = self.db().execute(&sql, libsql::params_from_iter(params)).await?;
        crate::helpers::ensure_affected(affected)?;

        self.audit(
            id,
            EntityType::User,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_user(id).await
    }

    pub async fn set_password(&self, user_id: &str, password_hash: &str) -> Result<(), DatabaseError> {
        let affected = self
            .db()
            .execute(
                "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                libsql::params![password_hash, Utc::now().to_rfc3339(), user_id],
            )
            .await?;
        crate::helpers::ensure_affected(affected)?;
        self.audit(user_id, EntityType::User, user_id, AuditAction::Updated, Some(serde_json::json!({"password": "changed"})))
            .await
    }

    /// Apply a billing change reported by the payment provider.
    ///
    /// `customer_id` of `None` keeps the stored customer id.
    pub async fn set_subscription(
        &self,
        user_id: &str,
        plan: Plan,
        status: SubscriptionStatus,
        customer_id: Option<&str>,
        event_type: &str,
    ) -> Result<User, DatabaseError> {
        let affected = self
            .db()
            .execute(
                "UPDATE users SET plan = ?1, subscription_status = ?2,
                        payment_customer_id = COALESCE(?3, payment_customer_id), updated_at = ?4
                 WHERE id = ?5",
                libsql::params![
                    plan.as_str(),
                    status.as_str(),
                    customer_id,
                    Utc::now().to_rfc3339(),
                    user_id
                ],
            )
            .await?;
        crate::helpers::ensure_affected(affected)?;

        let detail = SubscriptionChangedDetail {
            plan: plan.as_str().to_string(),
            status: status.as_str().to_string(),
            event_type: event_type.to_string(),
        };
        self.audit(
            user_id,
            EntityType::User,
            user_id,
            AuditAction::SubscriptionChanged,
            Some(serde_json::to_value(&detail)?),
        )
        .await?;
        tracing::info!(user_id, plan = %plan, status = %status, "subscription changed");
        self.get_user(user_id).await
    }

    async fn email_taken(&self, email: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .db()
            .query("SELECT 1 FROM users WHERE email = ?1", [email])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    async fn user_slug_taken(&self, slug: &str, except_id: Option<&str>) -> Result<bool, DatabaseError> {
        let mut rows = self
            .db()
            .query(
                "SELECT 1 FROM users WHERE slug = ?1 AND id != COALESCE(?2, '')",
                libsql::params![slug, except_id],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{create_test_user, test_service};
    use pretty_assertions::assert_eq;

    fn new_user(email: &str, name: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: name.to_string(),
            slug: None,
            password_hash: "$argon2id$hash".to_string(),
            specialty: Some("Dermatology".to_string()),
            phone: None,
        }
    }

    #[tokio::test]
    async fn create_user_roundtrip() {
        let svc = test_service().await;
        let user = svc.create_user(&new_user(" Ana@Clinic.com ", "Dra. Ana Souza")).await.unwrap();

        assert!(user.id.starts_with("usr-"));
        assert_eq!(user.email, "ana@clinic.com");
        assert_eq!(user.slug, "dra-ana-souza");
        assert_eq!(user.plan, Plan::Free);
        assert_eq!(user.subscription_status, SubscriptionStatus::Inactive);

        let by_email = svc.get_user_by_email("ANA@clinic.com").await.unwrap();
        assert_eq!(by_email.id, user.id);
        let by_slug = svc.get_user_by_slug("dra-ana-souza").await.unwrap();
        assert_eq!(by_slug.id, user.id);
    }

    #[tokio::test]
    async fn registration_creates_default_pipeline() {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Bruno Lima").await;
        let pipelines = svc.list_pipelines(&user.id).await.unwrap();
        assert_eq!(pipelines.len(), 1);
        assert!(pipelines[0].is_default);
        assert_eq!(pipelines[0].name, DEFAULT_PIPELINE_NAME);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let svc = test_service().await;
        svc.create_user(&new_user("a@x.com", "Ana One")).await.unwrap();
        let err = svc.create_user(&new_user("A@X.com", "Ana Two")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_slug_conflicts() {
        let svc = test_service().await;
        svc.create_user(&new_user("a@x.com", "Ana Souza")).await.unwrap();
        let err = svc.create_user(&new_user("b@x.com", "Ana Souza")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn invalid_email_rejected() {
        let svc = test_service().await;
        let err = svc.create_user(&new_user("nope", "Ana")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn update_user_partial_and_clear() {
        let svc = test_service().await;
        let user = svc.create_user(&new_user("a@x.com", "Ana Souza")).await.unwrap();

        let updated = svc
            .update_user(
                &user.id,
                UserUpdate {
                    name: Some("Ana S.".into()),
                    specialty: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ana S.");
        assert!(updated.specialty.is_none());
        assert_eq!(updated.slug, "ana-souza");
    }

    #[tokio::test]
    async fn update_user_slug_conflict() {
        let svc = test_service().await;
        let a = create_test_user(&svc, "Ana Souza").await;
        create_test_user(&svc, "Bruno Lima").await;
        let err = svc
            .update_user(
                &a.id,
                UserUpdate {
                    slug: Some("bruno-lima".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn password_and_login_lookup() {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Ana Souza").await;
        svc.set_password(&user.id, "$argon2id$new").await.unwrap();
        let (found, hash) = svc.get_login(&user.email).await.unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "$argon2id$new");
        assert!(matches!(svc.get_login("ghost@x.com").await, Err(DatabaseError::NoResult)));
    }

    #[tokio::test]
    async fn subscription_changes_and_customer_lookup() {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Ana Souza").await;

        let pro = svc
            .set_subscription(&user.id, Plan::Pro, SubscriptionStatus::Active, Some("cus_123"), "checkout.session.completed")
            .await
            .unwrap();
        assert_eq!(pro.plan, Plan::Pro);
        assert_eq!(pro.payment_customer_id.as_deref(), Some("cus_123"));

        let past_due = svc
            .set_subscription(&user.id, Plan::Pro, SubscriptionStatus::PastDue, None, "invoice.payment_failed")
            .await
            .unwrap();
        assert_eq!(past_due.subscription_status, SubscriptionStatus::PastDue);
        assert_eq!(past_due.payment_customer_id.as_deref(), Some("cus_123"));

        let found = svc.get_user_by_customer_id("cus_123").await.unwrap();
        assert_eq!(found.id, user.id);
    }
}
