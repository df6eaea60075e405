//! Habits and daily check-ins.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use praxis_core::entities::{Habit, HabitStats};
use praxis_core::enums::{AuditAction, EntityType, HabitFrequency};
use praxis_core::habit::current_streak;
use praxis_core::ids::PREFIX_HABIT;

use crate::error::DatabaseError;
use crate::helpers::{
    collect_rows, ensure_affected, format_date, get_bool, get_opt_string, parse_date,
    parse_datetime, parse_enum,
};
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::habit::HabitUpdate;

const SELECT_COLS: &str =
    "id, user_id, name, description, frequency, archived, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: HabitFrequency,
}

fn row_to_habit(row: &libsql::Row) -> Result<Habit, DatabaseError> {
    Ok(Habit {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        name: row.get::<String>(2)?,
        description: get_opt_string(row, 3)?,
        frequency: parse_enum(&row.get::<String>(4)?)?,
        archived: get_bool(row, 5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        updated_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

fn required_name(name: &str) -> Result<&str, DatabaseError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DatabaseError::Validation("habit name is required".into()));
    }
    Ok(name)
}

impl PraxisService {
    pub async fn create_habit(&self, user_id: &str, new: &NewHabit) -> Result<Habit, DatabaseError> {
        let name = required_name(&new.name)?;
        let id = self.db().generate_id(PREFIX_HABIT).await?;
        let now = Utc::now();

        self.db()
            .execute(
                "INSERT INTO habits (id, user_id, name, description, frequency, archived, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
                libsql::params![
                    id.as_str(),
                    user_id,
                    name,
                    new.description.as_deref(),
                    new.frequency.as_str(),
                    now.to_rfc3339()
                ],
            )
            .await?;
        self.audit(user_id, EntityType::Habit, &id, AuditAction::Created, None)
            .await?;

        Ok(Habit {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: new.description.clone(),
            frequency: new.frequency,
            archived: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_habit(&self, user_id: &str, id: &str) -> Result<Habit, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM habits WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_habit(&row)
    }

    pub async fn list_habits(
        &self,
        user_id: &str,
        include_archived: bool,
    ) -> Result<Vec<Habit>, DatabaseError> {
        let sql = format!(
            "SELECT {SELECT_COLS} FROM habits
             WHERE user_id = ?1 AND (?2 = 1 OR archived = 0)
             ORDER BY created_at"
        );
        let rows = self
            .db()
            .query(&sql, libsql::params![user_id, i64::from(include_archived)])
            .await?;
        collect_rows(rows, row_to_habit).await
    }

    pub async fn update_habit(
        &self,
        user_id: &str,
        id: &str,
        update: HabitUpdate,
    ) -> Result<Habit, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref name) = update.name {
            sets.set("name", required_name(name)?);
        }
        if let Some(ref description) = update.description {
            sets.set_opt("description", description.as_deref());
        }
        if let Some(frequency) = update.frequency {
            sets.set("frequency", frequency.as_str());
        }
        if let Some(archived) = update.archived {
            sets.set_bool("archived", archived);
        }

        if sets.is_empty() {
            return self.get_habit(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("habits", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;
        self.audit(
            user_id,
            EntityType::Habit,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_habit(user_id, id).await
    }

    /// Delete a habit and its check-in log.
    pub async fn delete_habit(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        let affected = self
            .db()
            .execute("DELETE FROM habits WHERE id = ?1 AND user_id = ?2", [id, user_id])
            .await?;
        ensure_affected(affected)?;
        self.audit(user_id, EntityType::Habit, id, AuditAction::Deleted, None)
            .await
    }

    /// Mark `day` as done. Checking in twice on the same day is a no-op.
    ///
    /// Archived habits reject new check-ins with `InvalidState`.
    pub async fn check_in(
        &self,
        user_id: &str,
        habit_id: &str,
        day: NaiveDate,
    ) -> Result<HabitStats, DatabaseError> {
        let habit = self.get_habit(user_id, habit_id).await?;
        if habit.archived {
            return Err(DatabaseError::InvalidState("habit is archived".into()));
        }

        let day_str = format_date(day);
        let inserted = self
            .db()
            .execute(
                "INSERT OR IGNORE INTO habit_logs (habit_id, day, created_at) VALUES (?1, ?2, ?3)",
                libsql::params![habit_id, day_str.as_str(), Utc::now().to_rfc3339()],
            )
            .await?;
        if inserted > 0 {
            self.audit(
                user_id,
                EntityType::Habit,
                habit_id,
                AuditAction::CheckedIn,
                Some(serde_json::json!({ "day": day_str })),
            )
            .await?;
        }
        self.habit_stats(user_id, habit_id, Utc::now().date_naive()).await
    }

    /// Remove the check-in for `day`, if any.
    pub async fn undo_check_in(
        &self,
        user_id: &str,
        habit_id: &str,
        day: NaiveDate,
    ) -> Result<HabitStats, DatabaseError> {
        self.get_habit(user_id, habit_id).await?;
        self.db()
            .execute(
                "DELETE FROM habit_logs WHERE habit_id = ?1 AND day = ?2",
                libsql::params![habit_id, format_date(day)],
            )
            .await?;
        self.habit_stats(user_id, habit_id, Utc::now().date_naive()).await
    }

    /// Check-in days of a habit, oldest first.
    pub async fn list_check_ins(
        &self,
        user_id: &str,
        habit_id: &str,
    ) -> Result<Vec<NaiveDate>, DatabaseError> {
        let mut rows = self
            .db()
            .query(
                "SELECT l.day FROM habit_logs l
                 JOIN habits h ON h.id = l.habit_id
                 WHERE l.habit_id = ?1 AND h.user_id = ?2
                 ORDER BY l.day",
                [habit_id, user_id],
            )
            .await?;
        let mut days = Vec::new();
        while let Some(row) = rows.next().await? {
            days.push(parse_date(&row.get::<String>(0)?)?);
        }
        Ok(days)
    }

    /// Streak and totals as seen on `today`.
    pub async fn habit_stats(
        &self,
        user_id: &str,
        habit_id: &str,
        today: NaiveDate,
    ) -> Result<HabitStats, DatabaseError> {
        self.get_habit(user_id, habit_id).await?;
        let days = self.list_check_ins(user_id, habit_id).await?;
        Ok(HabitStats {
            habit_id: habit_id.to_string(),
            current_streak: current_streak(&days, today),
            total_check_ins: u32::try_from(days.len()).unwrap_or(u32::MAX),
            last_check_in: days.last().copied(),
        })
    }
}
