//! Row-to-entity parsing helpers.
//!
//! Every repo converts `libsql::Row` (column-indexed) into typed entity
//! structs. These helpers isolate the parsing logic and handle the dual
//! datetime format (`SQLite`'s `datetime('now')` vs `to_rfc3339()`).

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::DatabaseError;

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Parse a `YYYY-MM-DD` column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` on malformed dates.
pub fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::Query(format!("Failed to parse date '{s}': {e}")))
}

/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string is not a date.
pub fn parse_optional_date(s: Option<&str>) -> Result<Option<NaiveDate>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_date(s)?)),
        _ => Ok(None),
    }
}

/// Format a date the way [`parse_date`] reads it.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with all praxis-core enums that use `#[serde(rename_all = "snake_case")]`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any enum variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Read an INTEGER 0/1 column as `bool`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_bool(row: &libsql::Row, idx: i32) -> Result<bool, DatabaseError> {
    Ok(row.get::<i64>(idx)? != 0)
}

/// Extract an optional JSON value from a TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string contains invalid JSON.
pub fn parse_optional_json(s: Option<&str>) -> Result<Option<serde_json::Value>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => {
            let val = serde_json::from_str(s)
                .map_err(|e| DatabaseError::Query(format!("Invalid JSON in column: {e}")))?;
            Ok(Some(val))
        }
        _ => Ok(None),
    }
}

/// Parse a JSON array-of-strings column (`options`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` on invalid JSON.
pub fn parse_string_list(s: &str) -> Result<Vec<String>, DatabaseError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(s)
        .map_err(|e| DatabaseError::Query(format!("Invalid string list in column: {e}")))
}

/// Drain a result set through a row mapper.
///
/// # Errors
///
/// Returns the first row-read or mapping error.
pub async fn collect_rows<T>(
    mut rows: libsql::Rows,
    map: fn(&libsql::Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(map(&row)?);
    }
    Ok(out)
}

/// Turn "zero rows affected" into `NoResult`.
///
/// # Errors
///
/// Returns `DatabaseError::NoResult` when `affected == 0`.
pub const fn ensure_affected(affected: u64) -> Result<(), DatabaseError> {
    if affected == 0 {
        Err(DatabaseError::NoResult)
    } else {
        Ok(())
    }
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Map `EntityType` to the corresponding SQL table name.
///
/// Uses exhaustive match so adding a new `EntityType` variant forces updating this.
#[must_use]
pub const fn entity_type_to_table(entity: &praxis_core::enums::EntityType) -> &'static str {
    use praxis_core::enums::EntityType;
    match entity {
        EntityType::User => "users",
        EntityType::Patient => "patients",
        EntityType::Lead => "leads",
        EntityType::Indication => "indications",
        EntityType::Page => "pages",
        EntityType::PageBlock => "page_blocks",
        EntityType::SocialLink => "social_links",
        EntityType::Address => "addresses",
        EntityType::InterestOption => "interest_options",
        EntityType::Pipeline => "pipelines",
        EntityType::ChatbotFlow => "chatbot_flows",
        EntityType::Quiz => "quizzes",
        EntityType::QuizQuestion => "quiz_questions",
        EntityType::Referral => "patient_referrals",
        EntityType::Reward => "referral_rewards",
        EntityType::Checkpoint => "checkpoints",
        EntityType::Habit => "habits",
        EntityType::EisenhowerTask => "eisenhower_tasks",
        EntityType::Clinic => "clinics",
        EntityType::Outbound => "outbounds",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use praxis_core::enums::LeadStatus;

    #[test]
    fn parses_both_datetime_formats() {
        let a = parse_datetime("2026-02-09T14:30:00+00:00").unwrap();
        let b = parse_datetime("2026-02-09 14:30:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn empty_optional_values_are_none() {
        assert!(parse_optional_datetime(Some("")).unwrap().is_none());
        assert!(parse_optional_date(None).unwrap().is_none());
        assert!(parse_optional_json(Some("")).unwrap().is_none());
    }

    #[test]
    fn date_roundtrip() {
        let d = parse_date("2026-03-01").unwrap();
        assert_eq!(format_date(d), "2026-03-01");
    }

    #[test]
    fn enum_parsing() {
        let status: LeadStatus = parse_enum("qualified").unwrap();
        assert_eq!(status, LeadStatus::Qualified);
        assert!(parse_enum::<LeadStatus>("nope").is_err());
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn string_list_parsing() {
        assert_eq!(parse_string_list(r#"["a","b"]"#).unwrap(), vec!["a", "b"]);
        assert!(parse_string_list("").unwrap().is_empty());
    }
}
