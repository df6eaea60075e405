//! Analytics event log.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use praxis_core::entities::Event;
use praxis_core::enums::EventKind;
use praxis_core::ids::PREFIX_EVENT;
use praxis_core::tracking::TrackedHit;

use crate::Tx;
use crate::error::DatabaseError;
use crate::helpers::{collect_rows, get_opt_string, parse_datetime, parse_enum, parse_optional_json};
use crate::service::PraxisService;

const SELECT_COLS: &str =
    "id, user_id, kind, page_id, indication_id, lead_id, path, referrer, visitor_id, metadata, created_at";

const INSERT_EVENT: &str = "INSERT INTO events (id, user_id, kind, page_id, indication_id, lead_id, path, referrer, visitor_id, metadata, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEvent {
    #[serde(default)]
    pub user_id: String,
    pub kind: EventKind,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub indication_id: Option<String>,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub visitor_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    pub kind: Option<EventKind>,
    pub page_id: Option<String>,
    pub indication_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

fn row_to_event(row: &libsql::Row) -> Result<Event, DatabaseError> {
    Ok(Event {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        kind: parse_enum(&row.get::<String>(2)?)?,
        page_id: get_opt_string(row, 3)?,
        indication_id: get_opt_string(row, 4)?,
        lead_id: get_opt_string(row, 5)?,
        path: get_opt_string(row, 6)?,
        referrer: get_opt_string(row, 7)?,
        visitor_id: get_opt_string(row, 8)?,
        metadata: parse_optional_json(get_opt_string(row, 9)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(10)?)?,
    })
}

fn event_params(id: &str, new: &NewEvent, now: DateTime<Utc>) -> Vec<libsql::Value> {
    let text = |v: Option<&str>| v.map_or(libsql::Value::Null, |s| libsql::Value::Text(s.to_string()));
    vec![
        id.into(),
        new.user_id.as_str().into(),
        new.kind.as_str().into(),
        text(new.page_id.as_deref()),
        text(new.indication_id.as_deref()),
        text(new.lead_id.as_deref()),
        text(new.path.as_deref()),
        text(new.referrer.as_deref()),
        text(new.visitor_id.as_deref()),
        text(new.metadata.as_ref().map(ToString::to_string).as_deref()),
        now.to_rfc3339().into(),
    ]
}

fn to_event(id: String, new: &NewEvent, now: DateTime<Utc>) -> Event {
    Event {
        id,
        user_id: new.user_id.clone(),
        kind: new.kind,
        page_id: new.page_id.clone(),
        indication_id: new.indication_id.clone(),
        lead_id: new.lead_id.clone(),
        path: new.path.clone(),
        referrer: new.referrer.clone(),
        visitor_id: new.visitor_id.clone(),
        metadata: new.metadata.clone(),
        created_at: now,
    }
}

impl PraxisService {
    /// Append an analytics event. Events are not audited.
    pub async fn record_event(&self, new: &NewEvent) -> Result<Event, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_EVENT).await?;
        self.db()
            .execute(INSERT_EVENT, libsql::params_from_iter(event_params(&id, new, now)))
            .await?;
        Ok(to_event(id, new, now))
    }

    pub(crate) async fn insert_event_in(
        &self,
        tx: &Tx<'_>,
        new: &NewEvent,
    ) -> Result<Event, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_EVENT).await?;
        tx.execute(INSERT_EVENT, libsql::params_from_iter(event_params(&id, new, now)))
            .await?;
        Ok(to_event(id, new, now))
    }

    /// Newest events first.
    pub async fn list_events(
        &self,
        user_id: &str,
        filter: &EventFilter,
        limit: u32,
    ) -> Result<Vec<Event>, DatabaseError> {
        let mut conditions = vec!["user_id = ?1".to_string()];
        let mut params: Vec<libsql::Value> = vec![user_id.into()];

        if let Some(kind) = filter.kind {
            params.push(kind.as_str().into());
            conditions.push(format!("kind = ?{}", params.len()));
        }
        if let Some(ref page_id) = filter.page_id {
            params.push(page_id.as_str().into());
            conditions.push(format!("page_id = ?{}", params.len()));
        }
        if let Some(ref indication_id) = filter.indication_id {
            params.push(indication_id.as_str().into());
            conditions.push(format!("indication_id = ?{}", params.len()));
        }
        if let Some(from) = filter.from {
            params.push(from.to_rfc3339().into());
            conditions.push(format!("created_at >= ?{}", params.len()));
        }
        if let Some(to) = filter.to {
            params.push(to.to_rfc3339().into());
            conditions.push(format!("created_at < ?{}", params.len()));
        }
        params.push(i64::from(limit).into());

        let sql = format!(
            "SELECT {SELECT_COLS} FROM events WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT ?{}",
            conditions.join(" AND "),
            params.len()
        );
        let rows = self.db().query(&sql, libsql::params_from_iter(params)).await?;
        collect_rows(rows, row_to_event).await
    }

    /// Resolve a tracked public URL to its owner and record the event.
    ///
    /// Page views count only for published pages; indication clicks also
    /// bump the indication's click counter. Unknown slugs yield `None`.
    pub async fn record_tracked_hit(
        &self,
        hit: &TrackedHit,
        path: &str,
        referrer: Option<&str>,
        visitor_id: Option<&str>,
    ) -> Result<Option<Event>, DatabaseError> {
        match hit.kind {
            EventKind::PageView => {
                let page = match self.get_page_by_slug(&hit.slug).await {
                    Ok(page) => page,
                    Err(DatabaseError::NoResult) => return Ok(None),
                    Err(e) => return Err(e),
                };
                let event = self
                    .record_event(&NewEvent {
                        user_id: page.user_id,
                        kind: EventKind::PageView,
                        page_id: Some(page.id),
                        path: Some(path.to_string()),
                        referrer: referrer.map(String::from),
                        visitor_id: visitor_id.map(String::from),
                        ..Default::default()
                    })
                    .await?;
                Ok(Some(event))
            }
            EventKind::IndicationClick => {
                match self
                    .record_indication_click(&hit.slug, path, referrer, visitor_id)
                    .await
                {
                    Ok(event) => Ok(Some(event)),
                    Err(DatabaseError::NoResult) => Ok(None),
                    Err(e) => Err(e),
                }
            }
            other => {
                tracing::debug!(kind = %other, "tracking rule kind has no resolver");
                Ok(None)
            }
        }
    }
}
