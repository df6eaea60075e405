//! Patient repository: CRUD, search and referral codes.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use praxis_core::entities::Patient;
use praxis_core::enums::{AuditAction, EntityType};
use praxis_core::ids::PREFIX_PATIENT;
use praxis_core::referral::referral_code;

use crate::Tx;
use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, ensure_affected, format_date, get_opt_string, like_pattern, parse_datetime,
    parse_optional_date,
};
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::patient::PatientUpdate;

pub(crate) const SELECT_COLS: &str = "id, user_id, name, email, phone, birth_date, notes, referral_code, referral_count, created_at, updated_at";

/// Attempts at drawing an unused referral code before giving up.
const CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPatient {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub(crate) fn row_to_patient(row: &libsql::Row) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        name: row.get::<String>(2)?,
        email: get_opt_string(row, 3)?,
        phone: get_opt_string(row, 4)?,
        birth_date: parse_optional_date(get_opt_string(row, 5)?.as_deref())?,
        notes: get_opt_string(row, 6)?,
        referral_code: row.get::<String>(7)?,
        referral_count: row.get::<i64>(8)?,
        created_at: parse_datetime(&row.get::<String>(9)?)?,
        updated_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

impl PraxisService {
    pub async fn create_patient(
        &self,
        user_id: &str,
        new: &NewPatient,
    ) -> Result<Patient, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result = self.insert_patient_in(&tx, user_id, new).await;
        tx.finish(result).await
    }

    /// Insert a patient inside an open transaction (also used by lead
    /// conversion).
    pub(crate) async fn insert_patient_in(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        new: &NewPatient,
    ) -> Result<Patient, DatabaseError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("patient name is required".into()));
        }

        let mut code = None;
        for _ in 0..CODE_ATTEMPTS {
            let candidate = referral_code(name, &self.db().random_hex(2).await?);
            let mut rows = tx
                .query("SELECT 1 FROM patients WHERE referral_code = ?1", [candidate.as_str()])
                .await?;
            if rows.next().await?.is_none() {
                code = Some(candidate);
                break;
            }
        }
        let code = code.ok_or_else(|| {
            DatabaseError::Conflict("could not allocate a unique referral code".into())
        })?;

        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_PATIENT).await?;
        tx.execute(
            "INSERT INTO patients (id, user_id, name, email, phone, birth_date, notes, referral_code, referral_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)",
            libsql::params![
                id.as_str(),
                user_id,
                name,
                new.email.as_deref(),
                new.phone.as_deref(),
                new.birth_date.map(format_date),
                new.notes.as_deref(),
                code.as_str(),
                now.to_rfc3339()
            ],
        )
        .await?;
        self.audit_in(tx, user_id, EntityType::Patient, &id, AuditAction::Created, None)
            .await?;

        Ok(Patient {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            birth_date: new.birth_date,
            notes: new.notes.clone(),
            referral_code: code,
            referral_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_patient(&self, user_id: &str, id: &str) -> Result<Patient, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM patients WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_patient(&row)
    }

    /// Patient owning a referral code (any tenant; used by the public
    /// referral form).
    pub async fn get_patient_by_referral_code(&self, code: &str) -> Result<Patient, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM patients WHERE referral_code = ?1");
        let mut rows = self.db().query(&sql, [code.trim().to_uppercase()]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_patient(&row)
    }

    /// List patients by name, optionally matching `search` against name,
    /// email or phone.
    pub async fn list_patients(
        &self,
        user_id: &str,
        search: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Patient>, DatabaseError> {
        let rows = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let sql = format!(
                    "SELECT {SELECT_COLS} FROM patients
                     WHERE user_id = ?1 AND (name LIKE ?2 ESCAPE '\\' OR email LIKE ?2 ESCAPE '\\' OR phone LIKE ?2 ESCAPE '\\')
                     ORDER BY name COLLATE NOCASE LIMIT ?3"
                );
                self.db()
                    .query(&sql, libsql::params![user_id, like_pattern(term), i64::from(limit)])
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {SELECT_COLS} FROM patients WHERE user_id = ?1
                     ORDER BY name COLLATE NOCASE LIMIT ?2"
                );
                self.db()
                    .query(&sql, libsql::params![user_id, i64::from(limit)])
                    .await?
            }
        };
        collect_rows(rows, row_to_patient).await
    }

    pub async fn update_patient(
        &self,
        user_id: &str,
        id: &str,
        update: PatientUpdate,
    ) -> Result<Patient, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref name) = update.name {
            if name.trim().is_empty() {
                return Err(DatabaseError::Validation("patient name is required".into()));
            }
            sets.set("name", name.trim());
        }
        if let Some(ref email) = update.email {
            sets.set_opt("email", email.as_deref());
        }
        if let Some(ref phone) = update.phone {
            sets.set_opt("phone", phone.as_deref());
        }
        if let Some(birth_date) = update.birth_date {
            sets.set_opt("birth_date", birth_date.map(format_date).as_deref());
        }
        if let Some(ref notes) = update.notes {
            sets.set_opt("notes", notes.as_deref());
        }

        if sets.is_empty() {
            return self.get_patient(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("patients", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;

        self.audit(
            user_id,
            EntityType::Patient,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_patient(user_id, id).await
    }

    /// Delete a patient. Leads keep their rows with `patient_id` cleared;
    /// rewards and referrals of the patient go with it.
    pub async fn delete_patient(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let affected = self
            .db()
            .execute("DELETE FROM patients WHERE id = ?1 AND user_id = ?2", [id, user_id])
            .await?;
        ensure_affected(affected)?;
        self.audit(user_id, EntityType::Patient, id, AuditAction::Deleted, None)
            .await
    }
}
