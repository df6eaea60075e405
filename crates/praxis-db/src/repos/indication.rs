//! Indication repository: trackable referral links.

use chrono::Utc;
use serde::Deserialize;

use praxis_core::entities::{Event, Indication};
use praxis_core::enums::{AuditAction, EntityType, EventKind};
use praxis_core::ids::PREFIX_INDICATION;
use praxis_core::slug;

use crate::error::DatabaseError;
use crate::helpers::{collect_rows, ensure_affected, get_bool, get_opt_string, parse_datetime};
use crate::repos::event::NewEvent;
use crate::service::PraxisService;
use crate::updates::SetClauses;
use crate::updates::indication::IndicationUpdate;

const SELECT_COLS: &str = "id, user_id, slug, name, description, target_url, clicks, leads_count, active, created_at, updated_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewIndication {
    pub name: String,
    /// Derived from `name` when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
}

fn row_to_indication(row: &libsql::Row) -> Result<Indication, DatabaseError> {
    Ok(Indication {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        slug: row.get::<String>(2)?,
        name: row.get::<String>(3)?,
        description: get_opt_string(row, 4)?,
        target_url: get_opt_string(row, 5)?,
        clicks: row.get::<i64>(6)?,
        leads_count: row.get::<i64>(7)?,
        active: get_bool(row, 8)?,
        created_at: parse_datetime(&row.get::<String>(9)?)?,
        updated_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

impl PraxisService {
    /// # Errors
    ///
    /// Returns `DatabaseError::Conflict` when the slug is used by any doctor.
    pub async fn create_indication(
        &self,
        user_id: &str,
        new: &NewIndication,
    ) -> Result<Indication, DatabaseError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::Validation("indication name is required".into()));
        }
        let slug = new
            .slug
            .as_deref()
            .map_or_else(|| slug::slugify(name), str::to_string);
        slug::validate(&slug)?;
        if self.indication_slug_taken(&slug, None).await? {
            return Err(DatabaseError::Conflict(format!("slug '{slug}' is already taken")));
        }

        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_INDICATION).await?;
        self.db()
            .execute(
                "INSERT INTO indications (id, user_id, slug, name, description, target_url, clicks, leads_count, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, 1, ?7, ?7)",
                libsql::params![
                    id.as_str(),
                    user_id,
                    slug.as_str(),
                    name,
                    new.description.as_deref(),
                    new.target_url.as_deref(),
                    now.to_rfc3339()
                ],
            )
            .await?;
        self.audit(user_id, EntityType::Indication, &id, AuditAction::Created, None)
            .await?;

        Ok(Indication {
            id,
            user_id: user_id.to_string(),
            slug,
            name: name.to_string(),
            description: new.description.clone(),
            target_url: new.target_url.clone(),
            clicks: 0,
            leads_count: 0,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_indication(&self, user_id: &str, id: &str) -> Result<Indication, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM indications WHERE id = ?1 AND user_id = ?2");
        let mut rows = self.db().query(&sql, [id, user_id]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_indication(&row)
    }

    /// Public lookup; inactive indications are reported as `NoResult`.
    pub async fn get_indication_by_slug(&self, slug: &str) -> Result<Indication, DatabaseError> {
        let sql = format!("SELECT {SELECT_COLS} FROM indications WHERE slug = ?1 AND active = 1");
        let mut rows = self.db().query(&sql, [slug]).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_indication(&row)
    }

    pub async fn list_indications(&self, user_id: &str) -> Result<Vec<Indication>, DatabaseError> {
        let sql = format!(
            "SELECT {SELECT_COLS} FROM indications WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        );
        let rows = self.db().query(&sql, [user_id]).await?;
        collect_rows(rows, row_to_indication).await
    }

    pub async fn update_indication(
        &self,
        user_id: &str,
        id: &str,
        update: IndicationUpdate,
    ) -> Result<Indication, DatabaseError> {
        let mut sets = SetClauses::new();
        if let Some(ref name) = update.name {
            if name.trim().is_empty() {
                return Err(DatabaseError::Validation("indication name is required".into()));
            }
            sets.set("name", name.trim());
        }
        if let Some(ref new_slug) = update.slug {
            slug::validate(new_slug)?;
            if self.indication_slug_taken(new_slug, Some(id)).await? {
                return Err(DatabaseError::Conflict(format!("slug '{new_slug}' is already taken")));
            }
            sets.set("slug", new_slug.as_str());
        }
        if let Some(ref description) = update.description {
            sets.set_opt("description", description.as_deref());
        }
        if let Some(ref target_url) = update.target_url {
            sets.set_opt("target_url", target_url.as_deref());
        }
        if let Some(active) = update.active {
            sets.set_bool("active", active);
        }

        if sets.is_empty() {
            return self.get_indication(user_id, id).await;
        }
        sets.set("updated_at", Utc::now().to_rfc3339());

        let (sql, params) = sets.into_sql("indications", id, Some(user_id));
        ensure_affected(self.db().execute(&sql, libsql::params_from_iter(params)).await?)?;
        self.audit(
            user_id,
            EntityType::Indication,
            id,
            AuditAction::Updated,
            Some(serde_json::to_value(&update)?),
        )
        .await?;
        self.get_indication(user_id, id).await
    }

    /// Leads keep their rows with `indication_id` nulled.
    pub async fn delete_indication(&self, user_id: &str, id: &str) -> Result<(), DatabaseError> {
        ensure_affected(
            self.db()
                .execute(
                    "DELETE FROM indications WHERE id = ?1 AND user_id = ?2",
                    [id, user_id],
                )
                .await?,
        )?;
        self.audit(user_id, EntityType::Indication, id, AuditAction::Deleted, None)
            .await
    }

    /// Count a visit to `/i/{slug}`: bump `clicks` and log an
    /// `indication_click` event in one transaction.
    pub async fn record_indication_click(
        &self,
        slug: &str,
        path: &str,
        referrer: Option<&str>,
        visitor_id: Option<&str>,
    ) -> Result<Event, DatabaseError> {
        let tx = self.db().transaction().await?;
        let result: Result<Event, DatabaseError> = async {
            let mut rows = tx
                .query(
                    "SELECT id, user_id FROM indications WHERE slug = ?1 AND active = 1",
                    [slug],
                )
                .await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            let indication_id = row.get::<String>(0)?;
            let user_id = row.get::<String>(1)?;

            tx.execute(
                "UPDATE indications SET clicks = clicks + 1 WHERE id = ?1",
                [indication_id.as_str()],
            )
            .await?;
            self.insert_event_in(
                &tx,
                &NewEvent {
                    user_id,
                    kind: EventKind::IndicationClick,
                    indication_id: Some(indication_id),
                    path: Some(path.to_string()),
                    referrer: referrer.map(String::from),
                    visitor_id: visitor_id.map(String::from),
                    ..Default::default()
                },
            )
            .await
        }
        .await;
        tx.finish(result).await
    }

    async fn indication_slug_taken(
        &self,
        slug: &str,
        except_id: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self
            .db()
            .query(
                "SELECT 1 FROM indications WHERE slug = ?1 AND id != COALESCE(?2, '')",
                libsql::params![slug, except_id],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::event::EventFilter;
    use crate::repos::lead::NewLead;
    use crate::test_support::helpers::{create_test_user, service_with_user};
    use praxis_core::enums::LeadSource;
    use praxis_core::tracking::TrackedHit;
    use pretty_assertions::assert_eq;

    fn indication(name: &str) -> NewIndication {
        NewIndication {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_derives_slug_from_name() {
        let (svc, user_id) = service_with_user().await;
        let ind = svc.create_indication(&user_id, &indication("Clínica Sorriso")).await.unwrap();
        assert!(ind.id.starts_with("ind-"));
        assert_eq!(ind.slug, "clinica-sorriso");
        assert!(ind.active);

        let by_slug = svc.get_indication_by_slug("clinica-sorriso").await.unwrap();
        assert_eq!(by_slug.id, ind.id);
    }

    #[tokio::test]
    async fn slug_is_unique_across_doctors() {
        let (svc, user_id) = service_with_user().await;
        let other = create_test_user(&svc, "Bruno Lima").await;
        svc.create_indication(&user_id, &indication("Academia")).await.unwrap();

        let err = svc.create_indication(&other.id, &indication("Academia")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn other_doctor_cannot_read_or_delete() {
        let (svc, user_id) = service_with_user().await;
        let other = create_test_user(&svc, "Bruno Lima").await;
        let ind = svc.create_indication(&user_id, &indication("Academia")).await.unwrap();

        assert!(matches!(svc.get_indication(&other.id, &ind.id).await, Err(DatabaseError::NoResult)));
        assert!(matches!(
            svc.delete_indication(&other.id, &ind.id).await,
            Err(DatabaseError::NoResult)
        ));
    }

    #[tokio::test]
    async fn inactive_indication_is_hidden_publicly() {
        let (svc, user_id) = service_with_user().await;
        let ind = svc.create_indication(&user_id, &indication("Academia")).await.unwrap();
        svc.update_indication(
            &user_id,
            &ind.id,
            IndicationUpdate {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            svc.get_indication_by_slug("academia").await,
            Err(DatabaseError::NoResult)
        ));
    }

    #[tokio::test]
    async fn click_bumps_counter_and_logs_event() {
        let (svc, user_id) = service_with_user().await;
        let ind = svc.create_indication(&user_id, &indication("Academia")).await.unwrap();

        svc.record_indication_click("academia", "/i/academia", Some("https://insta.example"), None)
            .await
            .unwrap();
        let hit = TrackedHit {
            kind: EventKind::IndicationClick,
            slug: "academia".into(),
        };
        svc.record_tracked_hit(&hit, "/i/academia", None, Some("v1")).await.unwrap();

        let ind = svc.get_indication(&user_id, &ind.id).await.unwrap();
        assert_eq!(ind.clicks, 2);
        let events = svc
            .list_events(
                &user_id,
                &EventFilter {
                    kind: Some(EventKind::IndicationClick),
                    ..Default::default()
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn attributed_leads_bump_leads_count() {
        let (svc, user_id) = service_with_user().await;
        let ind = svc.create_indication(&user_id, &indication("Academia")).await.unwrap();
        svc.create_lead(
            &user_id,
            &NewLead {
                name: "Carla".into(),
                source: LeadSource::Indication,
                indication_id: Some(ind.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(svc.get_indication(&user_id, &ind.id).await.unwrap().leads_count, 1);
    }
}
