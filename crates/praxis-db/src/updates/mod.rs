//! Update types for entity mutations.
//!
//! Each update struct has `Option` fields; only `Some` fields generate SET
//! clauses in the dynamic UPDATE SQL. Nullable columns use
//! `Option<Option<T>>` so that `Some(None)` clears the column. The structs
//! deserialize straight from PATCH bodies (an explicit JSON `null` becomes
//! `Some(None)`) and serialize (changed fields only) into the audit detail.

pub mod chatbot;
pub mod checkpoint;
pub mod clinic;
pub mod eisenhower;
pub mod habit;
pub mod indication;
pub mod lead;
pub mod page;
pub mod patient;
pub mod pipeline;
pub mod quiz;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Deserialize a present field (including `null`) as `Some(..)`.
///
/// Pair with `#[serde(default)]` so an absent field stays `None`.
///
/// # Errors
///
/// Propagates the inner deserializer's error.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accumulates `column = ?N` clauses for a dynamic UPDATE.
#[derive(Debug, Default)]
pub struct SetClauses {
    sets: Vec<String>,
    params: Vec<libsql::Value>,
}

impl SetClauses {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &str, value: impl Into<libsql::Value>) {
        self.params.push(value.into());
        self.sets.push(format!("{column} = ?{}", self.params.len()));
    }

    /// Set a nullable TEXT column.
    pub fn set_opt(&mut self, column: &str, value: Option<&str>) {
        self.set(column, value.map_or(libsql::Value::Null, |v| libsql::Value::Text(v.to_string())));
    }

    pub fn set_bool(&mut self, column: &str, value: bool) {
        self.set(column, i64::from(value));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Finish as `UPDATE {table} SET ... WHERE id = ? [AND user_id = ?]`.
    #[must_use]
    pub fn into_sql(
        mut self,
        table: &str,
        id: &str,
        user_id: Option<&str>,
    ) -> (String, Vec<libsql::Value>) {
        self.params.push(id.into());
        let mut sql = format!(
            "UPDATE {table} SET {} WHERE id = ?{}",
            self.sets.join(", "),
            self.params.len()
        );
        if let Some(user_id) = user_id {
            self.params.push(user_id.into());
            sql.push_str(&format!(" AND user_id = ?{}", self.params.len()));
        }
        (sql, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_numbered_placeholders() {
        let mut sets = SetClauses::new();
        sets.set("name", "Ana");
        sets.set_opt("email", None);
        sets.set_bool("active", true);
        let (sql, params) = sets.into_sql("patients", "pat-1", Some("usr-1"));
        assert_eq!(
            sql,
            "UPDATE patients SET name = ?1, email = ?2, active = ?3 WHERE id = ?4 AND user_id = ?5"
        );
        assert_eq!(params.len(), 5);
        assert_eq!(params[1], libsql::Value::Null);
    }

    #[test]
    fn double_option_distinguishes_null_from_absent() {
        #[derive(Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "double_option")]
            email: Option<Option<String>>,
        }
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"email":null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        assert_eq!(absent.email, None);
        assert_eq!(null.email, Some(None));
        assert_eq!(set.email, Some(Some("a@b.c".to_string())));
    }
}
