//! Pipeline repository: Kanban columns for leads.

use chrono::Utc;

use praxis_core::audit_detail::ReassignedDetail;
use praxis_core::entities::{Lead, Pipeline};
use praxis_core::enums::{AuditAction, EntityType};
use praxis_core::ids::PREFIX_PIPELINE;

use crate::error::DatabaseError;
use crate::helpers::{collect_rows, ensure_affected, get_bool, get_opt_string, parse_datetime};
use crate::repos::lead::{SELECT_COLS as LEAD_COLS, ensure_owned_in, next_position_in, row_to_lead};
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::pipeline::PipelineUpdate;

const SELECT_COLS: &str = "id, user_id, name, color, position, is_default, created_at, updated_at";

fn row_to_pipeline(row: &libsql::Row) -> Result<Pipeline, DatabaseError> {
    Ok(Pipeline {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        name: row.get::<String>(2)?,
        color: get_opt_string(row, 3)?,
        position: row.get::<i64>(4)?,
        is_default: get_bool(row, 5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        updated_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

impl PraxisService {
    /// Append a pipeline after the existing ones. A doctor's first pipeline
    /// becomes the default.
    pub async fn create_pipeline(
        &self,
        user_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> Result<Pipeline, DatabaseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("pipeline name is required".into()));
        }

        let tx = self.db().transaction().await?;
        let result: Result<Pipeline, DatabaseError> = async {
            let mut rows = tx
                .query(
                    "SELECT COALESCE(MAX(position) + 1, 0), COUNT(*) FROM pipelines WHERE user_id = ?1",
                    [user_id],
                )
                .await?;
            let (position, existing) = match rows.next().await? {
                Some(row) => (row.get::<i64>(0)?, row.get::<i64>(1)?),
                None => (0, 0),
            };
            let is_default = existing == 0;

            let now = Utc::now();
            let id = self.db().generate_id(PREFIX_PIPELINE).await?;
            tx.execute(
                "INSERT INTO pipelines (id, user_id, name, color, position, is_default, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                libsql::params![
                    id.as_str(),
                    user_id,
                    name,
                    color,
                    position,
                    i64::from(is_default),
                    now.to_rfc3339()
                ],
            )
            .await?;
            self.audit_in(&tx, user_id, EntityType::Pipeline, &id, AuditAction::Created, None)
                .await?;

            Ok(Pipeline {
                id,
                user_id: user_id.to_string(),
                name: name.to_string(),
                color: color.map(String::from),
                position,
                is_default,
                created_at: now,
                updated_at: now,
            })
        }
        .await;
        tx.finish(result).await
    }

    pub async fn get_pipeline(&self, user_id: &str, id: &str) -> Result<Pipeline, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM pipelines WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_pipeline(&row)
    }

    pub async fn list_pipelines(&self, user_id: &str) -> Result<Vec<Pipeline>, DatabaseError> {
        let sql = format!(
            "SELECT {SELECT_COLS} FROM pipelines WHERE user_id = ?1 ORDER BY position, created_at"
        );
        let rows = self.db().query(&sql, [user_id]).await?;
        collect_rows(rows, row_to_pipeline).await
    }

    /// Id of the doctor's default pipeline.
    pub async fn default_pipeline_id(&self, user_id: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .db()
            .query(
                "SELECT id FROM pipelines WHERE user_id = ?1 AND is_default = 1",
                [user_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }

    pub async fn update_pipeline(
        &self,
        user_id: &str,
        id: &str,
        update: PipelineUpdate,
    ) -> Result<Pipeline, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref name) = update.name {
            if name.trim().is_empty() {
                return Err(DatabaseError::Validation("pipeline name is required".into()));
            }
            sets.set("name", name.trim());
        }
        if let Some(ref color) = update.color {
            sets.set_opt("color", color.as_deref());
        }
        if let Some(position) = update.position {
            sets.set("position", position.max(0));
        }

        if sets.is_empty() {
            return self.get_pipeline(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("pipelines", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;
        self.audit(
            user_id,
            EntityType::Pipeline,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_pipeline(user_id, id).await
    }

    /// Delete a pipeline, appending its leads (in order) to `target` or to
    /// the default pipeline.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` for the default pipeline and
    /// `DatabaseError::Validation` when `target` is the pipeline itself.
    pub async fn delete_pipeline(
        &self,
        user_id: &str,
        id: &str,
        target: Option<&str>,
    ) -> Result<ReassignedDetail, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<ReassignedDetail, DatabaseError> = async {
            let mut rows = tx
                .query(
                    "SELECT is_default FROM pipelines WHERE id = ?1 AND user_id = ?2",
                    [id, user_id],
                )
                .await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            if get_bool(&row, 0)? {
                return Err(DatabaseError::InvalidState(
                    "the default pipeline cannot be deleted".into(),
                ));
            }

            let target_id = match target {
                Some(t) if t == id => {
                    return Err(DatabaseError::Validation(
                        "leads cannot be moved into the pipeline being deleted".into(),
                    ));
                }
                Some(t) => {
                    ensure_owned_in(&tx, "pipelines", t, user_id).await?;
                    t.to_string()
                }
                None => {
                    let mut rows = tx
                        .query(
                            "SELECT id FROM pipelines WHERE user_id = ?1 AND is_default = 1",
                            [user_id],
                        )
                        .await?;
                    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
                    row.get::<String>(0)?
                }
            };

            let base = next_position_in(&tx, user_id, Some(&target_id)).await?;
            let leads_moved = tx
                .execute(
                    "UPDATE leads SET pipeline_id = ?1, position = position + ?2
                     WHERE pipeline_id = ?3 AND user_id = ?4",
                    libsql::params![target_id.as_str(), base, id, user_id],
                )
                .await?;
            tx.execute("DELETE FROM pipelines WHERE id = ?1", [id]).await?;

            let detail = ReassignedDetail {
                target_pipeline: target_id,
                leads_moved,
            };
            self.audit_in(
                &tx,
                user_id,
                EntityType::Pipeline,
                id,
                AuditAction::Deleted,
                Some(serde_json::to_value(&detail)?),
            )
            .await?;
            Ok(detail)
        }
        .await;
        tx.finish(result).await
    }

    /// Make `id` the single default pipeline of the doctor.
    pub async fn set_default_pipeline(&self, user_id: &str, id: &str) -> Result<Pipeline, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<(), DatabaseError> = async {
            ensure_owned_in(&tx, "pipelines", id, user_id).await?;
            tx.execute(
                "UPDATE pipelines SET is_default = (id = ?1) WHERE user_id = ?2",
                [id, user_id],
            )
            .await?;
            self.audit_in(
                &tx,
                user_id,
                EntityType::Pipeline,
                id,
                AuditAction::Updated,
                Some(serde_json::json!({ "is_default": true })),
            )
            .await
        }
        .await;
        tx.finish(result).await?;
        self.get_pipeline(user_id, id).await
    }

    /// Leads of one column, by position.
    pub async fn list_pipeline_leads(
        &self,
        user_id: &str,
        pipeline_id: &str,
    ) -> Result<Vec<Lead>, DatabaseError> {
        self.get_pipeline(user_id, pipeline_id).await?;
        let sql = format!(
            "SELECT {LEAD_COLS} FROM leads WHERE pipeline_id = ?1 AND user_id = ?2 ORDER BY position"
        );
        let rows = self.db().query(&sql, [pipeline_id, user_id]).await?;
        collect_rows(rows, row_to_lead).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::lead::NewLead;
    use crate::test_support::helpers::{create_test_user, service_with_user};
    use pretty_assertions::assert_eq;

    async fn add_lead(svc: &PraxisService, user_id: &str, name: &str, pipeline_id: &str) -> Lead {
        svc.create_lead(
            user_id,
            &NewLead {
                name: name.to_string(),
                pipeline_id: Some(pipeline_id.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_appends_after_default() {
        let (svc, user_id) = service_with_user().await;
        let booked = svc.create_pipeline(&user_id, "Booked", Some("#22c55e")).await.unwrap();
        assert!(booked.id.starts_with("pip-"));
        assert_eq!(booked.position, 1);
        assert!(!booked.is_default);

        let names: Vec<String> = svc
            .list_pipelines(&user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["New leads".to_string(), "Booked".to_string()]);
    }

    #[tokio::test]
    async fn default_pipeline_cannot_be_deleted() {
        let (svc, user_id) = service_with_user().await;
        let default_id = svc.default_pipeline_id(&user_id).await.unwrap();
        let err = svc.delete_pipeline(&user_id, &default_id, None).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidState(_)));
    }

    #[tokio::test]
    async fn delete_moves_leads_to_end_of_default() {
        let (svc, user_id) = service_with_user().await;
        let default_id = svc.default_pipeline_id(&user_id).await.unwrap();
        let doomed = svc.create_pipeline(&user_id, "Cold", None).await.unwrap();
        add_lead(&svc, &user_id, "Existing", &default_id).await;
        add_lead(&svc, &user_id, "First", &doomed.id).await;
        add_lead(&svc, &user_id, "Second", &doomed.id).await;

        let detail = svc.delete_pipeline(&user_id, &doomed.id, None).await.unwrap();
        assert_eq!(detail.leads_moved, 2);
        assert_eq!(detail.target_pipeline, default_id);

        let column: Vec<(String, i64)> = svc
            .list_pipeline_leads(&user_id, &default_id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| (l.name, l.position))
            .collect();
        assert_eq!(
            column,
            vec![("Existing".into(), 0), ("First".into(), 1), ("Second".into(), 2)]
        );
        assert!(matches!(svc.get_pipeline(&user_id, &doomed.id).await, Err(DatabaseError::NoResult)));
    }

    #[tokio::test]
    async fn delete_into_explicit_target() {
        let (svc, user_id) = service_with_user().await;
        let doomed = svc.create_pipeline(&user_id, "Cold", None).await.unwrap();
        let target = svc.create_pipeline(&user_id, "Warm", None).await.unwrap();
        add_lead(&svc, &user_id, "Lead", &doomed.id).await;

        svc.delete_pipeline(&user_id, &doomed.id, Some(&target.id)).await.unwrap();
        assert_eq!(svc.list_pipeline_leads(&user_id, &target.id).await.unwrap().len(), 1);

        let err = svc
            .delete_pipeline(&user_id, &target.id, Some(&target.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn set_default_keeps_a_single_default() {
        let (svc, user_id) = service_with_user().await;
        let booked = svc.create_pipeline(&user_id, "Booked", None).await.unwrap();

        let updated = svc.set_default_pipeline(&user_id, &booked.id).await.unwrap();
        assert!(updated.is_default);
        let defaults = svc
            .list_pipelines(&user_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.is_default)
            .count();
        assert_eq!(defaults, 1);
        assert_eq!(svc.default_pipeline_id(&user_id).await.unwrap(), booked.id);
    }

    #[tokio::test]
    async fn foreign_pipeline_leads_are_hidden() {
        let (svc, user_id) = service_with_user().await;
        let other = create_test_user(&svc, "Bruno Lima").await;
        let default_id = svc.default_pipeline_id(&user_id).await.unwrap();

        assert!(matches!(
            svc.list_pipeline_leads(&other.id, &default_id).await,
            Err(DatabaseError::NoResult)
        ));
    }

    #[tokio::test]
    async fn update_renames_and_recolors() {
        let (svc, user_id) = service_with_user().await;
        let p = svc.create_pipeline(&user_id, "Booked", Some("#000")).await.unwrap();
        let updated = svc
            .update_pipeline(
                &user_id,
                &p.id,
                PipelineUpdate {
                    name: Some("Scheduled".into()),
                    color: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Scheduled");
        assert_eq!(updated.color, None);
    }
}
