//! Lead repository: capture, Kanban placement and conversion to patient.

use chrono::Utc;
use serde::Deserialize;

use praxis_core::audit_detail::{ConvertedDetail, MovedDetail};
use praxis_core::entities::{Lead, Patient};
use praxis_core::enums::{AuditAction, EntityType, EventKind, LeadSource, LeadStatus};
use praxis_core::ids::PREFIX_LEAD;

use crate::Tx;
use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, ensure_affected, get_opt_string, parse_datetime, parse_enum,
    parse_optional_json,
};
use crate::repos::event::NewEvent;
use crate::repos::patient::{NewPatient, SELECT_COLS as PATIENT_COLS, row_to_patient};
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::lead::LeadUpdate;

pub(crate) const SELECT_COLS: &str = "id, user_id, pipeline_id, patient_id, indication_id, page_id, name, email, phone, interest, notes, source, status, position, metadata, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLead {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub interest: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub source: LeadSource,
    /// Target column; the doctor's default pipeline when absent.
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub indication_id: Option<String>,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Filter criteria for lead listings.
#[derive(Debug, Default, Deserialize)]
pub struct LeadFilter {
    pub pipeline_id: Option<String>,
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    pub limit: Option<u32>,
}

pub(crate) fn row_to_lead(row: &libsql::Row) -> Result<Lead, DatabaseError> {
    Ok(Lead {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        pipeline_id: get_opt_string(row, 2)?,
        patient_id: get_opt_string(row, 3)?,
        indication_id: get_opt_string(row, 4)?,
        page_id: get_opt_string(row, 5)?,
        name: row.get::<String>(6)?,
        email: get_opt_string(row, 7)?,
        phone: get_opt_string(row, 8)?,
        interest: get_opt_string(row, 9)?,
        notes: get_opt_string(row, 10)?,
        source: parse_enum(&row.get::<String>(11)?)?,
        status: parse_enum(&row.get::<String>(12)?)?,
        position: row.get::<i64>(13)?,
        metadata: parse_optional_json(get_opt_string(row, 14)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(15)?)?,
        updated_at: parse_datetime(&row.get::<String>(16)?)?,
    })
}

/// Fail with `NoResult` unless `id` exists in `table` and belongs to `user_id`.
pub(crate) async fn ensure_owned_in(
    tx: &Tx<'_>,
    table: &str,
    id: &str,
    user_id: &str,
) -> Result<(), DatabaseError> {
    let sql = format!("SELECT 1 FROM {table} WHERE id = ?1 AND user_id = ?2");
    let mut rows = tx.query(&sql, [id, user_id]).await?;
    rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(())
}

impl PraxisService {
    pub async fn create_lead(&self, user_id: &str, new: &NewLead) -> Result<Lead, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result = self.insert_lead_in(&tx, user_id, new).await;
        let lead = tx.finish(result).await?;
        tracing::debug!(lead_id = %lead.id, source = %lead.source, "lead created");
        Ok(lead)
    }

    /// Insert a lead at the end of its pipeline column, bump the
    /// indication's lead counter and record a `lead_created` event.
    pub(crate) async fn insert_lead_in(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        new: &NewLead,
    ) -> Result<Lead, DatabaseError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("lead name is required".into()));
        }

        let pipeline_id = match new.pipeline_id.as_deref() {
            Some(pid) => {
                ensure_owned_in(tx, "pipelines", pid, user_id).await?;
                Some(pid.to_string())
            }
            None => {
                let mut rows = tx
                    .query(
                        "SELECT id FROM pipelines WHERE user_id = ?1 AND is_default = 1",
                        [user_id],
                    )
                    .await?;
                match rows.next().await? {
                    Some(row) => Some(row.get::<String>(0)?),
                    None => None,
                }
            }
        };
        if let Some(pid) = new.patient_id.as_deref() {
            ensure_owned_in(tx, "patients", pid, user_id).await?;
        }
        if let Some(iid) = new.indication_id.as_deref() {
            ensure_owned_in(tx, "indications", iid, user_id).await?;
        }
        if let Some(pid) = new.page_id.as_deref() {
            ensure_owned_in(tx, "pages", pid, user_id).await?;
        }

        let position = next_position_in(tx, user_id, pipeline_id.as_deref()).await?;
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_LEAD).await?;
        let metadata = new.metadata.as_ref().map(ToString::to_string);

        tx.execute(
            &format!(
                "INSERT INTO leads ({SELECT_COLS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)"
            ),
            libsql::params![
                id.as_str(),
                user_id,
                pipeline_id.as_deref(),
                new.patient_id.as_deref(),
                new.indication_id.as_deref(),
                new.page_id.as_deref(),
                name,
                new.email.as_deref(),
                new.phone.as_deref(),
                new.interest.as_deref(),
                new.notes.as_deref(),
                new.source.as_str(),
                LeadStatus::New.as_str(),
                position,
                metadata,
                now.to_rfc3339()
            ],
        )
        .await?;

        if let Some(iid) = new.indication_id.as_deref() {
            tx.execute(
                "UPDATE indications SET leads_count = leads_count + 1 WHERE id = ?1",
                [iid],
            )
            .await?;
        }

        self.insert_event_in(
            tx,
            &NewEvent {
                user_id: user_id.to_string(),
                kind: EventKind::LeadCreated,
                page_id: new.page_id.clone(),
                indication_id: new.indication_id.clone(),
                lead_id: Some(id.clone()),
                metadata: Some(serde_json::json!({ "source": new.source.as_str() })),
                ..Default::default()
            },
        )
        .await?;
        self.audit_in(tx, user_id, EntityType::Lead, &id, AuditAction::Created, None)
            .await?;

        Ok(Lead {
            id,
            user_id: user_id.to_string(),
            pipeline_id,
            patient_id: new.patient_id.clone(),
            indication_id: new.indication_id.clone(),
            page_id: new.page_id.clone(),
            name: name.to_string(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            interest: new.interest.clone(),
            notes: new.notes.clone(),
            source: new.source,
            status: LeadStatus::New,
            position,
            metadata: new.metadata.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_lead(&self, user_id: &str, id: &str) -> Result<Lead, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM leads WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_lead(&row)
    }

    /// Newest leads first, optionally filtered.
    pub async fn list_leads(
        &self,
        user_id: &str,
        filter: &LeadFilter,
        limit: u32,
    ) -> Result<Vec<Lead>, DatabaseError> {
        let mut conditions = vec!["user_id = ?1".to_string()];
        let mut params: Vec<libsql::Value> = vec![user_id.into()];

        if let Some(ref pid) = filter.pipeline_id {
            params.push(pid.as_str().into());
            conditions.push(format!("pipeline_id = ?{}", params.len()));
        }
        if let Some(status) = filter.status {
            params.push(status.as_str().into());
            conditions.push(format!("status = ?{}", params.len()));
        }
        if let Some(source) = filter.source {
            params.push(source.as_str().into());
            conditions.push(format!("source = ?{}", params.len()));
        }
        params.push(i64::from(limit).into());

        let sql = format!(
            "SELECT {SELECT_COLS} FROM leads WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT ?{}",
            conditions.join(" AND "),
            params.len()
        );
        let rows = self.db().query(&sql, libsql::params_from_iter(params)).await?;
        collect_rows(rows, row_to_lead).await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` when the update tries to set the
    /// `converted` status directly.
    pub async fn update_lead(
        &self,
        user_id: &str,
        id: &str,
        update: LeadUpdate,
    ) -> Result<Lead, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref name) = update.name {
            if name.trim().is_empty() {
                return Err(DatabaseError::Validation("lead name is required".into()));
            }
            sets.set("name", name.trim());
        }
        if let Some(ref email) = update.email {
            sets.set_opt("email", email.as_deref());
        }
        if let Some(ref phone) = update.phone {
            sets.set_opt("phone", phone.as_deref());
        }
        if let Some(ref interest) = update.interest {
            sets.set_opt("interest", interest.as_deref());
        }
        if let Some(ref notes) = update.notes {
            sets.set_opt("notes", notes.as_deref());
        }
        if let Some(status) = update.status {
            if status == LeadStatus::Converted {
                return Err(DatabaseError::Validation(
                    "use lead conversion to mark a lead converted".into(),
                ));
            }
            sets.set("status", status.as_str());
        }

        if sets.is_empty() {
            return self.get_lead(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("leads", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;

        self.audit(
            user_id,
            EntityType::Lead,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_lead(user_id, id).await
    }

    /// Delete a lead and close the gap it leaves in its column.
    pub async fn delete_lead(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            let lead = get_lead_in(&tx, user_id, id).await?;
            tx.execute("DELETE FROM leads WHERE id = ?1", [id]).await?;
            tx.execute(
                "UPDATE leads SET position = position - 1
                 WHERE user_id = ?1 AND pipeline_id IS ?2 AND position > ?3",
                libsql::params![user_id, lead.pipeline_id.as_deref(), lead.position],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::Lead, id, AuditAction::Deleted, None)
                .await
        }
        .await;
        tx.finish(result).await
    }

    /// Move a lead to `position` (clamped) in `pipeline_id`, shifting the
    /// neighbours of both the source and target columns.
    pub async fn move_lead(
        &self,
        user_id: &str,
        id: &str,
        pipeline_id: &str,
        position: i64,
    ) -> Result<Lead, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            let lead = get_lead_in(&tx, user_id, id).await?;
            ensure_owned_in(&tx, "pipelines", pipeline_id, user_id).await?;

            // close the gap in the source column
            tx.execute(
                "UPDATE leads SET position = position - 1
                 WHERE user_id = ?1 AND pipeline_id IS ?2 AND position > ?3 AND id != ?4",
                libsql::params![user_id, lead.pipeline_id.as_deref(), lead.position, id],
            )
            .await?;

            let mut rows = tx
                .query(
                    "SELECT COUNT(*) FROM leads WHERE user_id = ?1 AND pipeline_id = ?2 AND id != ?3",
                    [user_id, pipeline_id, id],
                )
                .await?;
            let count = match rows.next().await? {
                Some(row) => row.get::<i64>(0)?,
                None => 0,
            };
            let target = position.clamp(0, count);

            tx.execute(
                "UPDATE leads SET position = position + 1
                 WHERE user_id = ?1 AND pipeline_id = ?2 AND position >= ?3 AND id != ?4",
                libsql::params![user_id, pipeline_id, target, id],
            )
            .await?;
            tx.execute(
                "UPDATE leads SET pipeline_id = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
                libsql::params![pipeline_id, target, Utc::now().to_rfc3339(), id],
            )
            .await?;

            let detail = MovedDetail {
                from_pipeline: lead.pipeline_id,
                to_pipeline: pipeline_id.to_string(),
                position: target,
            };
            self.audit_in(
                &tx,
                user_id,
                EntityType::Lead,
                id,
                AuditAction::Moved,
                Some(serde_json::to_value(&detail)?),
            )
            .await
        }
        .await;
        tx.finish(result).await?;
        self.get_lead(user_id, id).await
    }

    /// Turn a lead into a patient (or attach its already linked patient)
    /// and mark it `converted`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the lead is already converted.
    pub async fn convert_lead(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<(Lead, Patient), DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<Patient, DatabaseError> = async {
            let lead = get_lead_in(&tx, user_id, id).await?;
            if lead.status == LeadStatus::Converted {
                return Err(DatabaseError::InvalidState(format!(
                    "lead {id} is already converted"
                )));
            }

            let patient = match lead.patient_id.as_deref() {
                Some(pid) => {
                    let sql = format!(
                        "SELECT {PATIENT_COLS} FROM patients WHERE id = ?1 AND user_id = ?2"
                    );
                    let mut rows = tx.query(&sql, [pid, user_id]).await?;
                    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
                    row_to_patient(&row)?
                }
                None => {
                    self.insert_patient_in(
                        &tx,
                        user_id,
                        &NewPatient {
                            name: lead.name.clone(),
                            email: lead.email.clone(),
                            phone: lead.phone.clone(),
                            birth_date: None,
                            notes: lead.notes.clone(),
                        },
                    )
                    .await?
                }
            };

            tx.execute(
                "UPDATE leads SET status = ?1, patient_id = ?2, updated_at = ?3 WHERE id = ?4",
                libsql::params![
                    LeadStatus::Converted.as_str(),
                    patient.id.as_str(),
                    Utc::now().to_rfc3339(),
                    id
                ],
            )
            .await?;

            let detail = ConvertedDetail {
                patient_id: patient.id.clone(),
            };
            self.audit_in(
                &tx,
                user_id,
                EntityType::Lead,
                id,
                AuditAction::Converted,
                Some(serde_json::to_value(&detail)?),
            )
            .await?;
            Ok(patient)
        }
        .await;
        let patient = tx.finish(result).await?;
        tracing::info!(lead_id = id, patient_id = %patient.id, "lead converted");
        let lead = self.get_lead(user_id, id).await?;
        Ok((lead, patient))
    }
}

async fn get_lead_in(tx: &Tx<'_>, user_id: &str, id: &str) -> Result<Lead, DatabaseError> {
    let sql = format!("SELECT {SELECT_COLS} FROM leads WHERE id = ?1 AND user_id = ?2");
    let mut rows = tx.query(&sql, [id, user_id]).await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    row_to_lead(&row)
}

/// Position one past the last lead of a column.
pub(crate) async fn next_position_in(
    tx: &Tx<'_>,
    user_id: &str,
    pipeline_id: Option<&str>,
) -> Result<i64, DatabaseError> {
    let mut rows = tx
        .query(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM leads WHERE user_id = ?1 AND pipeline_id IS ?2",
            libsql::params![user_id, pipeline_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get::<i64>(0)?),
        None => Ok(0),
    }
}
