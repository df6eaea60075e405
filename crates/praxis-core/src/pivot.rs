//! Pivot table configuration and reshaping.
//!
//! The analytics screen lets a doctor drag dimension and metric keys between
//! three buckets: rows, columns and metrics. This module owns those moves and
//! turns flat grouped records (one per row/column combination, produced by a
//! SQL `GROUP BY` in `praxis-db`) into a row × column table.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;

/// Upper bound on grouping keys (rows + columns) per pivot.
pub const MAX_DIMENSIONS: usize = 4;

/// Grouping key over analytics events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Kind,
    Day,
    Month,
    Page,
    Indication,
    Path,
}

impl Dimension {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kind => "kind",
            Self::Day => "day",
            Self::Month => "month",
            Self::Page => "page",
            Self::Indication => "indication",
            Self::Path => "path",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Number of events.
    Events,
    /// Distinct visitor fingerprints.
    Visitors,
    /// Distinct leads referenced by events.
    Leads,
}

impl Metric {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Visitors => "visitors",
            Self::Leads => "leads",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A draggable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotKey {
    Dimension(Dimension),
    Metric(Metric),
}

/// Drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Rows,
    Columns,
    Metrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotConfig {
    #[serde(default)]
    pub rows: Vec<Dimension>,
    #[serde(default)]
    pub columns: Vec<Dimension>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            rows: vec![Dimension::Day],
            columns: vec![Dimension::Kind],
            metrics: vec![Metric::Events],
        }
    }
}

impl PivotConfig {
    /// Dimensions in grouping order: rows first, then columns.
    #[must_use]
    pub fn dimensions(&self) -> Vec<Dimension> {
        self.rows.iter().chain(self.columns.iter()).copied().collect()
    }

    /// Check the configuration can be executed.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` when there is no metric, a key appears
    /// twice, or too many dimensions are grouped.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.metrics.is_empty() {
            return Err(CoreError::Validation("pivot needs at least one metric".into()));
        }
        let dims = self.dimensions();
        if dims.len() > MAX_DIMENSIONS {
            return Err(CoreError::Validation(format!(
                "pivot groups by at most {MAX_DIMENSIONS} dimensions"
            )));
        }
        for (i, d) in dims.iter().enumerate() {
            if dims[..i].contains(d) {
                return Err(CoreError::Validation(format!("dimension '{d}' used twice")));
            }
        }
        for (i, m) in self.metrics.iter().enumerate() {
            if self.metrics[..i].contains(m) {
                return Err(CoreError::Validation(format!("metric '{m}' used twice")));
            }
        }
        Ok(())
    }
}

/// Move `key` into `bucket` at `index` (clamped), removing it from wherever
/// it was.
///
/// # Errors
///
/// Returns `CoreError::Validation` when a metric is dropped on rows/columns
/// or a dimension on metrics.
pub fn move_key(
    config: &PivotConfig,
    key: PivotKey,
    bucket: Bucket,
    index: usize,
) -> Result<PivotConfig, CoreError> {
    let mut next = remove_key(config, key);
    match (key, bucket) {
        (PivotKey::Dimension(d), Bucket::Rows) => {
            let at = index.min(next.rows.len());
            next.rows.insert(at, d);
        }
        (PivotKey::Dimension(d), Bucket::Columns) => {
            let at = index.min(next.columns.len());
            next.columns.insert(at, d);
        }
        (PivotKey::Metric(m), Bucket::Metrics) => {
            let at = index.min(next.metrics.len());
            next.metrics.insert(at, m);
        }
        (PivotKey::Dimension(d), Bucket::Metrics) => {
            return Err(CoreError::Validation(format!(
                "dimension '{d}' cannot be used as a metric"
            )));
        }
        (PivotKey::Metric(m), Bucket::Rows | Bucket::Columns) => {
            return Err(CoreError::Validation(format!(
                "metric '{m}' cannot be used for grouping"
            )));
        }
    }
    Ok(next)
}

/// Copy of `config` without `key` in any bucket.
#[must_use]
pub fn remove_key(config: &PivotConfig, key: PivotKey) -> PivotConfig {
    let mut next = config.clone();
    match key {
        PivotKey::Dimension(d) => {
            next.rows.retain(|x| *x != d);
            next.columns.retain(|x| *x != d);
        }
        PivotKey::Metric(m) => next.metrics.retain(|x| *x != m),
    }
    next
}

/// One grouped record: dimension values in `PivotConfig::dimensions()` order,
/// metric values in `PivotConfig::metrics` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotRecord {
    pub dimensions: Vec<String>,
    pub metrics: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotCell {
    pub row: usize,
    pub column: usize,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotTable {
    pub config: PivotConfig,
    pub row_keys: Vec<Vec<String>>,
    pub column_keys: Vec<Vec<String>>,
    pub cells: Vec<PivotCell>,
    /// Grand totals per metric.
    pub totals: Vec<f64>,
}

/// Reshape grouped records into a table.
///
/// Row and column keys keep first-seen order, so callers control ordering
/// through the SQL `ORDER BY`. Records sharing a row/column pair are summed.
#[must_use]
pub fn build_table(config: &PivotConfig, records: &[PivotRecord]) -> PivotTable {
    let split = config.rows.len();
    let metric_count = config.metrics.len();

    let mut row_keys: Vec<Vec<String>> = Vec::new();
    let mut column_keys: Vec<Vec<String>> = Vec::new();
    let mut cells: Vec<PivotCell> = Vec::new();
    let mut totals = vec![0.0; metric_count];

    for record in records {
        let (row_part, column_part) = record.dimensions.split_at(split.min(record.dimensions.len()));
        let row = index_of_or_push(&mut row_keys, row_part);
        let column = index_of_or_push(&mut column_keys, column_part);

        let cell = match cells.iter_mut().position(|c| c.row == row && c.column == column) {
            Some(i) => &mut cells[i],
            None => {
                cells.push(PivotCell {
                    row,
                    column,
                    values: vec![0.0; metric_count],
                });
                let last = cells.len() - 1;
                &mut cells[last]
            }
        };
        for (i, value) in record.metrics.iter().take(metric_count).enumerate() {
            cell.values[i] += value;
            totals[i] += value;
        }
    }

    PivotTable {
        config: config.clone(),
        row_keys,
        column_keys,
        cells,
        totals,
    }
}

fn index_of_or_push(keys: &mut Vec<Vec<String>>, key: &[String]) -> usize {
    if let Some(i) = keys.iter().position(|k| k.as_slice() == key) {
        return i;
    }
    keys.push(key.to_vec());
    keys.len() - 1
}
