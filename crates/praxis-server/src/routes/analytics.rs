//! Dashboard analytics: summary, daily series, event log and pivot tables.

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use praxis_core::entities::Event;
use praxis_core::enums::EventKind;
use praxis_core::pivot::{Bucket, PivotConfig, PivotKey, PivotTable, move_key, remove_key};
use praxis_db::repos::analytics::{AnalyticsSummary, DateRange, SeriesPoint};
use praxis_db::repos::event::EventFilter;

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

const DEFAULT_DAYS: u32 = 30;
const MAX_DAYS: u32 = 366;

/// Either an explicit `from`/`to` window or the last `days` days.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub days: Option<u32>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RangeQuery {
    fn resolve(&self, now: DateTime<Utc>) -> Result<DateRange, ApiError> {
        let range = match (self.from, self.to) {
            (Some(from), Some(to)) => DateRange { from, to },
            (None, None) => {
                DateRange::last_days(self.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS), now)
            }
            _ => return Err(ApiError::BadRequest("'from' and 'to' must be given together".into())),
        };
        range.validate()?;
        Ok(range)
    }
}

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub kind: EventKind,
    pub days: Option<u32>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct PivotRequest {
    #[serde(default)]
    pub config: PivotConfig,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct MoveKeyRequest {
    pub config: PivotConfig,
    pub key: PivotKey,
    pub bucket: Bucket,
    #[serde(default)]
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct RemoveKeyRequest {
    pub config: PivotConfig,
    pub key: PivotKey,
}

/// `GET /api/analytics/summary?days=` or `?from=&to=`
pub async fn summary(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    let range = query.resolve(Utc::now())?;
    Ok(Json(state.service.analytics_summary(user.id(), &range).await?))
}

/// `GET /api/analytics/series?kind=page_view`: one point per day, zeros
/// included.
pub async fn series(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<Vec<SeriesPoint>>, ApiError> {
    let range = RangeQuery {
        days: query.days,
        from: query.from,
        to: query.to,
    }
    .resolve(Utc::now())?;
    let points = state
        .service
        .daily_series(user.id(), query.kind, &range)
        .await?;
    Ok(Json(points))
}

/// `GET /api/analytics/events`: raw event log, newest first.
pub async fn events(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<EventFilter>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let limit = state.limit(filter.limit);
    Ok(Json(state.service.list_events(user.id(), &filter, limit).await?))
}

/// `POST /api/analytics/pivot`
pub async fn pivot(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PivotRequest>,
) -> Result<Json<PivotTable>, ApiError> {
    let range = RangeQuery {
        days: req.days,
        from: req.from,
        to: req.to,
    }
    .resolve(Utc::now())?;
    let table = state.service.run_pivot(user.id(), &req.config, &range).await?;
    Ok(Json(table))
}

/// `POST /api/analytics/pivot/move`: drag a key into a bucket; returns the
/// new configuration without running it.
pub async fn pivot_move(
    _user: CurrentUser,
    Json(req): Json<MoveKeyRequest>,
) -> Result<Json<PivotConfig>, ApiError> {
    Ok(Json(move_key(&req.config, req.key, req.bucket, req.index)?))
}

/// `POST /api/analytics/pivot/remove`
pub async fn pivot_remove(
    _user: CurrentUser,
    Json(req): Json<RemoveKeyRequest>,
) -> Result<Json<PivotConfig>, ApiError> {
    Ok(Json(remove_key(&req.config, req.key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn days_default_to_thirty() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        let range = RangeQuery::default().resolve(now).unwrap();
        assert_eq!(range, DateRange::last_days(30, now));
    }

    #[test]
    fn half_open_window_is_rejected() {
        let now = Utc::now();
        let query = RangeQuery {
            from: Some(now),
            ..Default::default()
        };
        assert!(matches!(query.resolve(now), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn inverted_window_is_a_validation_error() {
        let now = Utc::now();
        let query = RangeQuery {
            days: None,
            from: Some(now),
            to: Some(now - chrono::Duration::days(1)),
        };
        assert!(matches!(query.resolve(now), Err(ApiError::Validation(_))));
    }
}
