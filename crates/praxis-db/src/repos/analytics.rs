//! Analytics aggregates over the event log and leads.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use praxis_core::enums::EventKind;
use praxis_core::pivot::{Dimension, Metric, PivotConfig, PivotRecord, PivotTable, build_table};

use crate::error::DatabaseError;
use crate::helpers::parse_date;
use crate::service::PraxisService;

/// Half-open time window `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// The `days` days up to and including `now`'s day.
    #[must_use]
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        let end = now.date_naive() + Duration::days(1);
        let start = end - Duration::days(i64::from(days.max(1)));
        Self {
            from: start.and_time(chrono::NaiveTime::MIN).and_utc(),
            to: end.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::Validation` when `from` is not before `to`.
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.from >= self.to {
            return Err(DatabaseError::Validation("range start must be before its end".into()));
        }
        Ok(())
    }

    fn days(&self) -> Vec<NaiveDate> {
        let last = (self.to - Duration::nanoseconds(1)).date_naive();
        self.from
            .date_naive()
            .iter_days()
            .take_while(|d| *d <= last)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub range: DateRange,
    pub events_by_kind: BTreeMap<String, i64>,
    pub leads_by_source: BTreeMap<String, i64>,
    pub leads_by_status: BTreeMap<String, i64>,
    pub total_leads: i64,
    pub converted_leads: i64,
    /// `converted_leads / total_leads`, 0 when there are no leads.
    pub conversion_rate: f64,
    pub unique_visitors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub day: NaiveDate,
    pub count: i64,
}

const fn dimension_sql(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Kind => "e.kind",
        Dimension::Day => "substr(e.created_at, 1, 10)",
        Dimension::Month => "substr(e.created_at, 1, 7)",
        Dimension::Page => "COALESCE(p.slug, '(none)')",
        Dimension::Indication => "COALESCE(i.slug, '(none)')",
        Dimension::Path => "COALESCE(e.path, '(none)')",
    }
}

const fn metric_sql(metric: Metric) -> &'static str {
    match metric {
        Metric::Events => "COUNT(*)",
        Metric::Visitors => "COUNT(DISTINCT e.visitor_id)",
        Metric::Leads => "COUNT(DISTINCT e.lead_id)",
    }
}

/// Build the grouped SELECT for a pivot. Only whitelisted expressions are
/// interpolated; user values travel as parameters.
fn pivot_sql(config: &PivotConfig) -> String {
    let dims: Vec<&str> = config.dimensions().into_iter().map(dimension_sql).collect();
    let metrics: Vec<&str> = config.metrics.iter().copied().map(metric_sql).collect();

    let mut select: Vec<String> = dims
        .iter()
        .enumerate()
        .map(|(i, expr)| format!("{expr} AS d{i}"))
        .collect();
    select.extend(metrics.iter().enumerate().map(|(i, expr)| format!("{expr} AS m{i}")));

    let mut sql = format!(
        "SELECT {} FROM events e
         LEFT JOIN pages p ON p.id = e.page_id
         LEFT JOIN indications i ON i.id = e.indication_id
         WHERE e.user_id = ?1 AND e.created_at >= ?2 AND e.created_at < ?3",
        select.join(", ")
    );
    if !dims.is_empty() {
        let positions: Vec<String> = (1..=dims.len()).map(|i| i.to_string()).collect();
        sql.push_str(&format!(
            " GROUP BY {} ORDER BY {}",
            positions.join(", "),
            positions.join(", ")
        ));
    }
    sql
}

impl PraxisService {
    async fn count_by(
        &self,
        sql: &str,
        user_id: &str,
        range: &DateRange,
    ) -> Result<BTreeMap<String, i64>, DatabaseError> {
        let mut rows = self
            .db()
            .query(
                sql,
                libsql::params![user_id, range.from.to_rfc3339(), range.to.to_rfc3339()],
            )
            .await?;
        let mut out = BTreeMap::new();
        while let Some(row) = rows.next().await? {
            out.insert(row.get::<String>(0)?, row.get::<i64>(1)?);
        }
        Ok(out)
    }

    /// Event and lead counts for the dashboard.
    pub async fn analytics_summary(
        &self,
        user_id: &str,
        range: &DateRange,
    ) -> Result<AnalyticsSummary, DatabaseError> {
        range.validate()?;
        let events_by_kind = self
            .count_by(
                "SELECT kind, COUNT(*) FROM events
                 WHERE user_id = ?1 AND created_at >= ?2 AND created_at < ?3 GROUP BY kind",
                user_id,
                range,
            )
            .await?;
        let leads_by_source = self
            .count_by(
                "SELECT source, COUNT(*) FROM leads
                 WHERE user_id = ?1 AND created_at >= ?2 AND created_at < ?3 GROUP BY source",
                user_id,
                range,
            )
            .await?;
        let leads_by_status = self
            .count_by(
                "SELECT status, COUNT(*) FROM leads
                 WHERE user_id = ?1 AND created_at >= ?2 AND created_at < ?3 GROUP BY status",
                user_id,
                range,
            )
            .await?;

        let mut rows = self
            .db()
            .query(
                "SELECT COUNT(DISTINCT visitor_id) FROM events
                 WHERE user_id = ?1 AND created_at >= ?2 AND created_at < ?3",
                libsql::params![user_id, range.from.to_rfc3339(), range.to.to_rfc3339()],
            )
            .await?;
        let unique_visitors = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };

        let total_leads: i64 = leads_by_source.values().sum();
        let converted_leads = leads_by_status.get("converted").copied().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let conversion_rate = if total_leads == 0 {
            0.0
        } else {
            converted_leads as f64 / total_leads as f64
        };

        Ok(AnalyticsSummary {
            range: *range,
            events_by_kind,
            leads_by_source,
            leads_by_status,
            total_leads,
            converted_leads,
            conversion_rate,
            unique_visitors,
        })
    }

    /// Daily event counts of one kind, with days without events as zero.
    pub async fn daily_series(
        &self,
        user_id: &str,
        kind: EventKind,
        range: &DateRange,
    ) -> Result<Vec<SeriesPoint>, DatabaseError> {
        range.validate()?;
        let mut rows = self
            .db()
            .query(
                "SELECT substr(created_at, 1, 10), COUNT(*) FROM events
                 WHERE user_id = ?1 AND kind = ?2 AND created_at >= ?3 AND created_at < ?4
                 GROUP BY 1",
                libsql::params![
                    user_id,
                    kind.as_str(),
                    range.from.to_rfc3339(),
                    range.to.to_rfc3339()
                ],
            )
            .await?;
        let mut counts = BTreeMap::new();
        while let Some(row) = rows.next().await? {
            counts.insert(parse_date(&row.get::<String>(0)?)?, row.get::<i64>(1)?);
        }

        Ok(range
            .days()
            .into_iter()
            .map(|day| SeriesPoint {
                day,
                count: counts.get(&day).copied().unwrap_or(0),
            })
            .collect())
    }

    /// Group events by the configured dimensions and reshape into a table.
    pub async fn run_pivot(
        &self,
        user_id: &str,
        config: &PivotConfig,
        range: &DateRange,
    ) -> Result<PivotTable, DatabaseError> {
        config.validate()?;
        range.validate()?;

        let dim_count = config.rows.len() + config.columns.len();
        let metric_count = config.metrics.len();
        let sql = pivot_sql(config);
        let mut rows = self
            .db()
            .query(
                &sql,
                libsql::params![user_id, range.from.to_rfc3339(), range.to.to_rfc3339()],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let mut dimensions = Vec::with_capacity(dim_count);
            for i in 0..dim_count {
                dimensions.push(row.get::<String>(column_index(i)?)?);
            }
            let mut metrics = Vec::with_capacity(metric_count);
            for i in 0..metric_count {
                #[allow(clippy::cast_precision_loss)]
                metrics.push(row.get::<i64>(column_index(dim_count + i)?)? as f64);
            }
            records.push(PivotRecord { dimensions, metrics });
        }

        Ok(build_table(config, &records))
    }
}

fn column_index(i: usize) -> Result<i32, DatabaseError> {
    i32::try_from(i).map_err(|_| DatabaseError::Query(format!("column index {i} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::event::NewEvent;
    use crate::repos::lead::NewLead;
    use crate::repos::page::NewPage;
    use crate::test_support::helpers::service_with_user;
    use praxis_core::enums::LeadSource;
    use pretty_assertions::assert_eq;

    fn today() -> DateRange {
        DateRange::last_days(1, Utc::now())
    }

    async fn view(svc: &PraxisService, user_id: &str, page_id: Option<&str>, visitor: &str) {
        svc.record_event(&NewEvent {
            user_id: user_id.to_string(),
            kind: EventKind::PageView,
            page_id: page_id.map(String::from),
            visitor_id: Some(visitor.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    }

    #[test]
    fn last_days_covers_whole_days() {
        let now = DateTime::parse_from_rfc3339("2026-03-10T15:30:00Z").unwrap().with_timezone(&Utc);
        let range = DateRange::last_days(7, now);
        assert_eq!(range.from.to_rfc3339(), "2026-03-04T00:00:00+00:00");
        assert_eq!(range.to.to_rfc3339(), "2026-03-11T00:00:00+00:00");
        assert_eq!(range.days().len(), 7);
    }

    #[test]
    fn pivot_sql_groups_by_position() {
        let config = PivotConfig {
            rows: vec![Dimension::Page],
            columns: vec![Dimension::Kind],
            metrics: vec![Metric::Events, Metric::Visitors],
        };
        let sql = pivot_sql(&config);
        assert!(sql.contains("COALESCE(p.slug, '(none)') AS d0"));
        assert!(sql.contains("COUNT(DISTINCT e.visitor_id) AS m1"));
        assert!(sql.ends_with("GROUP BY 1, 2 ORDER BY 1, 2"));
    }

    #[tokio::test]
    async fn summary_counts_events_and_conversions() {
        let (svc, user_id) = service_with_user().await;
        view(&svc, &user_id, None, "v1").await;
        view(&svc, &user_id, None, "v1").await;
        view(&svc, &user_id, None, "v2").await;
        let lead = svc
            .create_lead(
                &user_id,
                &NewLead {
                    name: "Carla".into(),
                    source: LeadSource::Form,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        svc.create_lead(
            &user_id,
            &NewLead {
                name: "Dora".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        svc.convert_lead(&user_id, &lead.id).await.unwrap();

        let summary = svc.analytics_summary(&user_id, &today()).await.unwrap();
        assert_eq!(summary.events_by_kind.get("page_view"), Some(&3));
        assert_eq!(summary.events_by_kind.get("lead_created"), Some(&2));
        assert_eq!(summary.leads_by_source.get("form"), Some(&1));
        assert_eq!(summary.total_leads, 2);
        assert_eq!(summary.converted_leads, 1);
        assert!((summary.conversion_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(summary.unique_visitors, 2);
    }

    #[tokio::test]
    async fn series_is_zero_filled() {
        let (svc, user_id) = service_with_user().await;
        view(&svc, &user_id, None, "v1").await;

        let range = DateRange::last_days(3, Utc::now());
        let series = svc.daily_series(&user_id, EventKind::PageView, &range).await.unwrap();
        let counts: Vec<i64> = series.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![0, 0, 1]);
    }

    #[tokio::test]
    async fn pivot_by_page_and_kind() {
        let (svc, user_id) = service_with_user().await;
        let page = svc
            .create_page(
                &user_id,
                &NewPage {
                    title: "Consultório".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        view(&svc, &user_id, Some(&page.id), "v1").await;
        view(&svc, &user_id, Some(&page.id), "v2").await;
        view(&svc, &user_id, None, "v3").await;

        let config = PivotConfig {
            rows: vec![Dimension::Page],
            columns: vec![Dimension::Kind],
            metrics: vec![Metric::Events],
        };
        let table = svc.run_pivot(&user_id, &config, &today()).await.unwrap();
        assert_eq!(
            table.row_keys,
            vec![vec!["(none)".to_string()], vec!["consultorio".to_string()]]
        );
        assert_eq!(table.column_keys, vec![vec!["page_view".to_string()]]);
        assert_eq!(table.totals, vec![3.0]);
    }

    #[tokio::test]
    async fn invalid_pivot_is_rejected() {
        let (svc, user_id) = service_with_user().await;
        let config = PivotConfig {
            rows: vec![Dimension::Day],
            columns: vec![],
            metrics: vec![],
        };
        let err = svc.run_pivot(&user_id, &config, &today()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_range_is_rejected() {
        let (svc, user_id) = service_with_user().await;
        let now = Utc::now();
        let range = DateRange { from: now, to: now };
        assert!(matches!(
            svc.analytics_summary(&user_id, &range).await,
            Err(DatabaseError::Validation(_))
        ));
    }
}
