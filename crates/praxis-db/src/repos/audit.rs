//! Audit trail repository.
//!
//! Append-only audit entries recording every mutation. Supports dynamic
//! filtering.

use chrono::Utc;
use praxis_core::entities::AuditEntry;
use praxis_core::enums::{AuditAction, EntityType};
use praxis_core::ids::PREFIX_AUDIT;

use crate::Tx;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_json};
use crate::service::PraxisService;

const INSERT_AUDIT: &str = "INSERT INTO audit_trail (id, user_id, entity_type, entity_id, action, detail, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

/// Filter criteria for audit queries.
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub user_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: Option<u32>,
}

fn audit_params(entry: &AuditEntry) -> Vec<libsql::Value> {
    vec![
        entry.id.as_str().into(),
        entry.user_id.as_deref().into(),
        entry.entity_type.as_str().into(),
        entry.entity_id.as_str().into(),
        entry.action.as_str().into(),
        entry
            .detail
            .as_ref()
            .map(std::string::ToString::to_string)
            .into(),
        entry.created_at.to_rfc3339().into(),
    ]
}

impl PraxisService {
    /// Append an audit entry.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn append_audit(&self, entry: &AuditEntry) -> Result<(), DatabaseError> {
        self.db()
            .execute(INSERT_AUDIT, libsql::params_from_iter(audit_params(entry)))
            .await?;
        Ok(())
    }

    async fn new_audit_entry(
        &self,
        user_id: &str,
        entity_type: EntityType,
        entity_id: &str,
        action: AuditAction,
        detail: Option<serde_json::Value>,
    ) -> Result<AuditEntry, DatabaseError> {
        Ok(AuditEntry {
            id: self.db().generate_id(PREFIX_AUDIT).await?,
            user_id: Some(user_id.to_string()),
            entity_type,
            entity_id: entity_id.to_string(),
            action,
            detail,
            created_at: Utc::now(),
        })
    }

    /// Record a mutation outside a transaction.
    pub(crate) async fn audit(
        &self,
        user_id: &str,
        entity_type: EntityType,
        entity_id: &str,
        action: AuditAction,
        detail: Option<serde_json::Value>,
    ) -> Result<(), DatabaseError> {
        let entry = self
            .new_audit_entry(user_id, entity_type, entity_id, action, detail)
            .await?;
        self.append_audit(&entry).await
    }

    /// Record a mutation inside `tx`.
    pub(crate) async fn audit_in(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        entity_type: EntityType,
        entity_id: &str,
        action: AuditAction,
        detail: Option<serde_json::Value>,
    ) -> Result<(), DatabaseError> {
        let entry = self
            .new_audit_entry(user_id, entity_type, entity_id, action, detail)
            .await?;
        tx.execute(INSERT_AUDIT, libsql::params_from_iter(audit_params(&entry)))
            .await?;
        Ok(())
    }

    /// Query audit entries with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref uid) = filter.user_id {
            params.push(libsql::Value::Text(uid.clone()));
            conditions.push(format!("user_id = ?{}", params.len()));
        }
        if let Some(ref et) = filter.entity_type {
            params.push(libsql::Value::Text(et.as_str().to_string()));
            conditions.push(format!("entity_type = ?{}", params.len()));
        }
        if let Some(ref eid) = filter.entity_id {
            params.push(libsql::Value::Text(eid.clone()));
            conditions.push(format!("entity_id = ?{}", params.len()));
        }
        if let Some(ref action) = filter.action {
            params.push(libsql::Value::Text(action.as_str().to_string()));
            conditions.push(format!("action = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or(100);
        let sql = format!(
            "SELECT id, user_id, entity_type, entity_id, action, detail, created_at
             FROM audit_trail {where_clause}
             ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next().await? {
            entries.push(AuditEntry {
                id: row.get::<String>(0)?,
                user_id: get_opt_string(&row, 1)?,
                entity_type: parse_enum(&row.get::<String>(2)?)?,
                entity_id: row.get::<String>(3)?,
                action: parse_enum(&row.get::<String>(4)?)?,
                detail: parse_optional_json(get_opt_string(&row, 5)?.as_deref())?,
                created_at: parse_datetime(&row.get::<String>(6)?)?,
            });
        }

        Ok(entries)
    }
}
