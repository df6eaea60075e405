//! Outbound prospecting: clinics and the contact log.

use chrono::Utc;
use serde::Deserialize;

use praxis_core::entities::{Clinic, Outbound};
use praxis_core::enums::{AuditAction, ClinicStatus, EntityType, OutboundChannel};
use praxis_core::ids::{PREFIX_CLINIC, PREFIX_OUTBOUND};

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, ensure_affected, get_opt_string, like_pattern, parse_datetime, parse_enum,
    parse_optional_datetime,
};
use crate::repos::lead::ensure_owned_in;
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::clinic::ClinicUpdate;

const SELECT_COLS: &str = "id, user_id, name, contact_name, city, phone, email, website, specialty, notes, status, last_contacted_at, created_at, updated_at";

const OUTBOUND_COLS: &str = "id, user_id, clinic_id, channel, message, created_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewClinic {
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClinicFilter {
    pub status: Option<ClinicStatus>,
    pub city: Option<String>,
    pub search: Option<String>,
}

fn row_to_clinic(row: &libsql::Row) -> Result<Clinic, DatabaseError> {
    Ok(Clinic {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        name: row.get::<String>(2)?,
        contact_name: get_opt_string(row, 3)?,
        city: get_opt_string(row, 4)?,
        phone: get_opt_string(row, 5)?,
        email: get_opt_string(row, 6)?,
        website: get_opt_string(row, 7)?,
        specialty: get_opt_string(row, 8)?,
        notes: get_opt_string(row, 9)?,
        status: parse_enum(&row.get::<String>(10)?)?,
        last_contacted_at: parse_optional_datetime(get_opt_string(row, 11)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(12)?)?,
        updated_at: parse_datetime(&row.get::<String>(13)?)?,
    })
}

fn row_to_outbound(row: &libsql::Row) -> Result<Outbound, DatabaseError> {
    Ok(Outbound {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        clinic_id: row.get::<String>(2)?,
        channel: parse_enum(&row.get::<String>(3)?)?,
        message: row.get::<String>(4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

fn required_name(name: &str) -> Result<&str, DatabaseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DatabaseError::Validation("clinic name is required".into()));
    }
    Ok(name)
}

impl PraxisService {
    pub async fn create_clinic(&self, user_id: &str, new: &NewClinic) -> Result<Clinic, DatabaseError> {
        let name = required_name(&new.name)?;
        let id = self.db().generate_id(PREFIX_CLINIC).await?;
        let now = Utc::now().to_rfc3339();

        self.db()
            .execute(
                "INSERT INTO clinics (id, user_id, name, contact_name, city, phone, email, website, specialty, notes, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                libsql::params![
                    id.as_str(),
                    user_id,
                    name,
                    new.contact_name.as_deref(),
                    new.city.as_deref(),
                    new.phone.as_deref(),
                    new.email.as_deref(),
                    new.website.as_deref(),
                    new.specialty.as_deref(),
                    new.notes.as_deref(),
                    ClinicStatus::Prospect.as_str(),
                    now
                ],
            )
            .await?;
        self.audit(user_id, EntityType::Clinic, &id, AuditAction::Created, None)
            .await?;
        self.get_clinic(user_id, &id).await
    }

    pub async fn get_clinic(&self, user_id: &str, id: &str) -> Result<Clinic, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM clinics WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_clinic(&row)
    }

    /// Clinics by name; `search` matches name, contact or specialty.
    pub async fn list_clinics(
        &self,
        user_id: &str,
        filter: &ClinicFilter,
    ) -> Result<Vec<Clinic>, DatabaseError> {
        let mut conditions = vec!["user_id = ?1".to_string()];
        let mut params: Vec<libsql::Value> = vec![user_id.into()];

        if let Some(status) = filter.status {
            params.push(status.as_str().into());
            conditions.push(format!("status = ?{}", params.len()));
        }
        if let Some(ref city) = filter.city {
            params.push(city.trim().into());
            conditions.push(format!("city = ?{} COLLATE NOCASE", params.len()));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(like_pattern(term).into());
            let n = params.len();
            conditions.push(format!(
                "(name LIKE ?{n} ESCAPE '\\' OR contact_name LIKE ?{n} ESCAPE '\\' OR specialty LIKE ?{n} ESCAPE '\\')"
            ));
        }

        let sql = format!(
            "SELECT {SELECT_COLS} FROM clinics WHERE {} ORDER BY name COLLATE NOCASE",
            conditions.join(" AND ")
        );
        let rows = self.db().query(&sql, libsql::params_from_iter(params)).await?;
        collect_rows(rows, row_to_clinic).await
    }

    pub async fn update_clinic(
        &self,
        user_id: &str,
        id: &str,
        update: ClinicUpdate,
    ) -> Result<Clinic, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref name) = update.name {
            sets.set("name", required_name(name)?);
        }
        let optional = [
            ("contact_name", &update.contact_name),
            ("city", &update.city),
            ("phone", &update.phone),
            ("email", &update.email),
            ("website", &update.website),
            ("specialty", &update.specialty),
            ("notes", &update.notes),
        ];
        for (column, value) in optional {
            if let Some(value) = value {
                sets.set_opt(column, value.as_deref());
            }
        }
        if let Some(status) = update.status {
            sets.set("status", status.as_str());
        }

        if sets.is_empty() {
            return self.get_clinic(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("clinics", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;
        self.audit(
            user_id,
            EntityType::Clinic,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_clinic(user_id, id).await
    }

    /// Delete a clinic along with its contact log.
    pub async fn delete_clinic(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let affected = self
            .db()
            .execute("DELETE FROM clinics WHERE id = ?1 AND user_id = ?2", [id, user_id])
            .await?;
        ensure_affected(affected)?;
        self.audit(user_id, EntityType::Clinic, id, AuditAction::Deleted, None)
            .await
    }

    /// Record a contact attempt. Stamps `last_contacted_at` and moves a
    /// clinic still in `prospect` to `contacted`.
    pub async fn log_outbound(
        &self,
        user_id: &str,
        clinic_id: &str,
        channel: OutboundChannel,
        message: &str,
    ) -> Result<Outbound, DatabaseError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(DatabaseError::Validation("outbound message is required".into()));
        }

        let tx = self.db().transaction().await?;
        let result: Result<Outbound, DatabaseError> = async {
            ensure_owned_in(&tx, "clinics", clinic_id, user_id).await?;

            let now = Utc::now();
            let id = self.db().generate_id(PREFIX_OUTBOUND).await?;
            tx.execute(
                "INSERT INTO outbounds (id, user_id, clinic_id, channel, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    id.as_str(),
                    user_id,
                    clinic_id,
                    channel.as_str(),
                    message,
                    now.to_rfc3339()
                ],
            )
            .await?;
            tx.execute(
                "UPDATE clinics
                 SET last_contacted_at = ?1,
                     status = CASE WHEN status = ?2 THEN ?3 ELSE status END,
                     updated_at = ?1
                 WHERE id = ?4",
                libsql::params![
                    now.to_rfc3339(),
                    ClinicStatus::Prospect.as_str(),
                    ClinicStatus::Contacted.as_str(),
                    clinic_id
                ],
            )
            .await?;
            self.audit_in(
                &tx,
                user_id,
                EntityType::Outbound,
                &id,
                AuditAction::Created,
                Some(serde_json::json!({ "clinic_id": clinic_id, "channel": channel.as_str() })),
            )
            .await?;

            Ok(Outbound {
                id,
                user_id: user_id.to_string(),
                clinic_id: clinic_id.to_string(),
                channel,
                message: message.to_string(),
                created_at: now,
            })
        }
        .await;
        tx.finish(result).await
    }

    /// Contact log of a clinic, newest first.
    pub async fn list_outbound(
        &self,
        user_id: &str,
        clinic_id: &str,
    ) -> Result<Vec<Outbound>, DatabaseError> {
        self.get_clinic(user_id, clinic_id).await?;
        let sql = format!(
            "SELECT {OUTBOUND_COLS} FROM outbounds
             WHERE clinic_id = ?1 AND user_id = ?2
             ORDER BY created_at DESC"
        );
        let rows = self.db().query(&sql, [clinic_id, user_id]).await?;
        collect_rows(rows, row_to_outbound).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{create_test_user, service_with_user};
    use pretty_assertions::assert_eq;

    fn clinic(name: &str, city: &str) -> NewClinic {
        NewClinic {
            name: name.to_string(),
            city: Some(city.to_string()),
            specialty: Some("Dermatology".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn new_clinics_start_as_prospects() {
        let (svc, user_id) = service_with_user().await;
        let created = svc.create_clinic(&user_id, &clinic("Clínica Sol", "Recife")).await.unwrap();
        assert!(created.id.starts_with("cln-"));
        assert_eq!(created.status, ClinicStatus::Prospect);
        assert!(created.last_contacted_at.is_none());
    }

    #[tokio::test]
    async fn outbound_marks_prospect_as_contacted() {
        let (svc, user_id) = service_with_user().await;
        let created = svc.create_clinic(&user_id, &clinic("Derma Mais", "Recife")).await.unwrap();

        let logged = svc
            .log_outbound(&user_id, &created.id, OutboundChannel::Whatsapp, "Olá, tudo bem?")
            .await
            .unwrap();
        assert!(logged.id.starts_with("out-"));

        let clinic = svc.get_clinic(&user_id, &created.id).await.unwrap();
        assert_eq!(clinic.status, ClinicStatus::Contacted);
        assert!(clinic.last_contacted_at.is_some());

        let log = svc.list_outbound(&user_id, &created.id).await.unwrap();
        assert_eq!(log, vec![logged]);
    }

    #[tokio::test]
    async fn outbound_keeps_advanced_status() {
        let (svc, user_id) = service_with_user().await;
        let created = svc.create_clinic(&user_id, &clinic("Vida", "Olinda")).await.unwrap();
        svc.update_clinic(
            &user_id,
            &created.id,
            ClinicUpdate {
                status: Some(ClinicStatus::Meeting),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        svc.log_outbound(&user_id, &created.id, OutboundChannel::Email, "Follow-up")
            .await
            .unwrap();
        let clinic = svc.get_clinic(&user_id, &created.id).await.unwrap();
        assert_eq!(clinic.status, ClinicStatus::Meeting);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let (svc, user_id) = service_with_user().await;
        let created = svc.create_clinic(&user_id, &clinic("Vida", "Olinda")).await.unwrap();
        let err = svc
            .log_outbound(&user_id, &created.id, OutboundChannel::Phone, " ")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn outbound_on_foreign_clinic_fails() {
        let (svc, user_id) = service_with_user().await;
        let other = create_test_user(&svc, "Other").await;
        let created = svc.create_clinic(&user_id, &clinic("Vida", "Olinda")).await.unwrap();

        let err = svc
            .log_outbound(&other.id, &created.id, OutboundChannel::Visit, "Hi")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NoResult));
        assert!(svc.list_outbound(&user_id, &created.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filter_by_city_and_search() {
        let (svc, user_id) = service_with_user().await;
        svc.create_clinic(&user_id, &clinic("Alpha", "Recife")).await.unwrap();
        svc.create_clinic(&user_id, &clinic("Beta", "Olinda")).await.unwrap();

        let recife = svc
            .list_clinics(
                &user_id,
                &ClinicFilter {
                    city: Some("recife".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(recife.len(), 1);
        assert_eq!(recife[0].name, "Alpha");

        let search = svc
            .list_clinics(
                &user_id,
                &ClinicFilter {
                    search: Some("bet".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].name, "Beta");
    }
}
