//! Eisenhower matrix tasks.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use praxis_core::entities::{EisenhowerMatrix, EisenhowerTask};
use praxis_core::enums::{AuditAction, EntityType, Quadrant};
use praxis_core::ids::PREFIX_EISENHOWER;

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, ensure_affected, format_date, get_bool, get_opt_string, parse_datetime,
    parse_optional_date,
};
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::eisenhower::EisenhowerUpdate;

const SELECT_COLS: &str =
    "id, user_id, title, notes, urgent, important, done, due_date, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEisenhowerTask {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

fn row_to_task(row: &libsql::Row) -> Result<EisenhowerTask, DatabaseError> {
    let urgent = get_bool(row, 4)?;
    let important = get_bool(row, 5)?;
    Ok(EisenhowerTask {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        title: row.get::<String>(2)?,
        notes: get_opt_string(row, 3)?,
        urgent,
        important,
        quadrant: Quadrant::from_flags(urgent, important),
        done: get_bool(row, 6)?,
        due_date: parse_optional_date(get_opt_string(row, 7)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
        updated_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

fn required_title(title: &str) -> Result<&str, DatabaseError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DatabaseError::Validation("task title is required".into()));
    }
    Ok(title)
}

impl PraxisService {
    pub async fn create_eisenhower_task(
        &self,
        user_id: &str,
        new: &NewEisenhowerTask,
    ) -> Result<EisenhowerTask, DatabaseError> {
        let title = required_title(&new.title)?;
        let id = self.db().generate_id(PREFIX_EISENHOWER).await?;
        let now = Utc::now().to_rfc3339();

        self.db()
            .execute(
                "INSERT INTO eisenhower_tasks (id, user_id, title, notes, urgent, important, done, due_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?8)",
                libsql::params![
                    id.as_str(),
                    user_id,
                    title,
                    new.notes.as_deref(),
                    i64::from(new.urgent),
                    i64::from(new.important),
                    new.due_date.map(format_date),
                    now
                ],
            )
            .await?;
        self.audit(user_id, EntityType::EisenhowerTask, &id, AuditAction::Created, None)
            .await?;
        self.get_eisenhower_task(user_id, &id).await
    }

    pub async fn get_eisenhower_task(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<EisenhowerTask, DatabaseError> {
        let sql =
            format!("SELECT {SELECT_COLS} FROM eisenhower_tasks WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_task(&row)
    }

    /// Open tasks first, then by due date (undated last) and age.
    pub async fn list_eisenhower_tasks(
        &self,
        user_id: &str,
        include_done: bool,
    ) -> Result<Vec<EisenhowerTask>, DatabaseError> {
        let sql = format!(
            "SELECT {SELECT_COLS} FROM eisenhower_tasks
             WHERE user_id = ?1 AND (?2 = 1 OR done = 0)
             ORDER BY done, due_date IS NULL, due_date, created_at"
        );
        let rows = self
            .db()
            .query(&sql, libsql::params![user_id, i64::from(include_done)])
            .await?;
        collect_rows(rows, row_to_task).await
    }

    /// Tasks grouped into the four quadrants.
    pub async fn list_matrix(
        &self,
        user_id: &str,
        include_done: bool,
    ) -> Result<EisenhowerMatrix, DatabaseError> {
        let tasks = self.list_eisenhower_tasks(user_id, include_done).await?;
        Ok(EisenhowerMatrix::from_tasks(tasks))
    }

    pub async fn update_eisenhower_task(
        &self,
        user_id: &str,
        id: &str,
        update: EisenhowerUpdate,
    ) -> Result<EisenhowerTask, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref title) = update.title {
            sets.set("title", required_title(title)?);
        }
        if let Some(ref notes) = update.notes {
            sets.set_opt("notes", notes.as_deref());
        }
        if let Some(urgent) = update.urgent {
            sets.set_bool("urgent", urgent);
        }
        if let Some(important) = update.important {
            sets.set_bool("important", important);
        }
        if let Some(done) = update.done {
            sets.set_bool("done", done);
        }
        if let Some(due_date) = update.due_date {
            sets.set_opt("due_date", due_date.map(format_date).as_deref());
        }

        if sets.is_empty() {
            return self.get_eisenhower_task(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("eisenhower_tasks", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;

        let action = if update.urgent.is_some() || update.important.is_some() {
            AuditAction::Moved
        } else {
            AuditAction::Updated
        };
        self.audit(
            user_id,
            EntityType::EisenhowerTask,
            id,
            action,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_eisenhower_task(user_id, id).await
    }

    pub async fn delete_eisenhower_task(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .db()
            .execute(
                "DELETE FROM eisenhower_tasks WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )
            .await?;
        ensure_affected(affected)?;
        self.audit(user_id, EntityType::EisenhowerTask, id, AuditAction::Deleted, None)
            .await
    }
}
