//! Checkpoints: the doctor's ordered practice checklist.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use praxis_core::entities::Checkpoint;
use praxis_core::enums::{AuditAction, EntityType};
use praxis_core::ids::PREFIX_CHECKPOINT;

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, ensure_affected, format_date, get_opt_string, parse_datetime,
    parse_optional_date, parse_optional_datetime,
};
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::checkpoint::CheckpointUpdate;

const SELECT_COLS: &str =
    "id, user_id, title, description, due_date, completed_at, position, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCheckpoint {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

fn row_to_checkpoint(row: &libsql::Row) -> Result<Checkpoint, DatabaseError> {
    Ok(Checkpoint {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        title: row.get::<String>(2)?,
        description: get_opt_string(row, 3)?,
        due_date: parse_optional_date(get_opt_string(row, 4)?.as_deref())?,
        completed_at: parse_optional_datetime(get_opt_string(row, 5)?.as_deref())?,
        position: row.get::<i64>(6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

fn required_title(title: &str) -> Result<&str, DatabaseError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DatabaseError::Validation("checkpoint title is required".into()));
    }
    Ok(title)
}

impl PraxisService {
    /// Append a checkpoint to the end of the list.
    pub async fn create_checkpoint(
        &self,
        user_id: &str,
        new: &NewCheckpoint,
    ) -> Result<Checkpoint, DatabaseError> {
        let title = required_title(&new.title)?;
        let id = self.db().generate_id(PREFIX_CHECKPOINT).await?;
        let now = Utc::now().to_rfc3339();

        self.db()
            .execute(
                "INSERT INTO checkpoints (id, user_id, title, description, due_date, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5,
                         (SELECT COALESCE(MAX(position) + 1, 0) FROM checkpoints WHERE user_id = ?2),
                         ?6, ?6)",
                libsql::params![
                    id.as_str(),
                    user_id,
                    title,
                    new.description.as_deref(),
                    new.due_date.map(format_date),
                    now
                ],
            )
            .await?;
        self.audit(user_id, EntityType::Checkpoint, &id, AuditAction::Created, None)
            .await?;
        self.get_checkpoint(user_id, &id).await
    }

    pub async fn get_checkpoint(&self, user_id: &str, id: &str) -> Result<Checkpoint, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM checkpoints WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_checkpoint(&row)
    }

    pub async fn list_checkpoints(&self, user_id: &str) -> Result<Vec<Checkpoint>, DatabaseError> {
        let sql = format!(
            "SELECT {SELECT_COLS} FROM checkpoints WHERE user_id = ?1 ORDER BY position, created_at"
        );
        let rows = self.db().query(&sql, [user_id]).await?;
        collect_rows(rows, row_to_checkpoint).await
    }

    pub async fn update_checkpoint(
        &self,
        user_id: &str,
        id: &str,
        update: CheckpointUpdate,
    ) -> Result<Checkpoint, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref title) = update.title {
            sets.set("title", required_title(title)?);
        }
        if let Some(ref description) = update.description {
            sets.set_opt("description", description.as_deref());
        }
        if let Some(due_date) = update.due_date {
            sets.set_opt("due_date", due_date.map(format_date).as_deref());
        }
        if let Some(position) = update.position {
            sets.set("position", position.max(0));
        }

        if sets.is_empty() {
            return self.get_checkpoint(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("checkpoints", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;
        self.audit(
            user_id,
            EntityType::Checkpoint,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_checkpoint(user_id, id).await
    }

    /// Flip a checkpoint between done and open.
    pub async fn toggle_checkpoint(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Checkpoint, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let affected = self
            .db()
            .execute(
                "UPDATE checkpoints
                 SET completed_at = CASE WHEN completed_at IS NULL THEN ?1 ELSE NULL END,
                     updated_at = ?1
                 WHERE id = ?2 AND user_id = ?3",
                libsql::params![now, id, user_id],
            )
            .await?;
        ensure_affected(affected)?;

        let checkpoint = self.get_checkpoint(user_id, id).await?;
        self.audit(
            user_id,
            EntityType::Checkpoint,
            id,
            AuditAction::Toggled,
            Some(serde_json::json!({ "completed": checkpoint.completed_at.is_some() })),
        )
        .await?;
        Ok(checkpoint)
    }

    pub async fn delete_checkpoint(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let affected = self
            .db()
            .execute("DELETE FROM checkpoints WHERE id = ?1 AND user_id = ?2", [id, user_id])
            .await?;
        ensure_affected(affected)?;
        self.audit(user_id, EntityType::Checkpoint, id, AuditAction::Deleted, None)
            .await
    }
}
