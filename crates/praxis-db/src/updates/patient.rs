//! Patient update builder.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::double_option;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
}

pub struct PatientUpdateBuilder(PatientUpdate);

impl PatientUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(PatientUpdate::default())
    }

    #[must_use]
    pub fn name(mut self, val: impl Into<String>) -> Self {
        self.0.name = Some(val.into());
        self
    }

    #[must_use]
    pub fn email(mut self, val: Option<String>) -> Self {
        self.0.email = Some(val);
        self
    }

    #[must_use]
    pub fn phone(mut self, val: Option<String>) -> Self {
        self.0.phone = Some(val);
        self
    }

    #[must_use]
    pub const fn birth_date(mut self, val: Option<NaiveDate>) -> Self {
        self.0.birth_date = Some(val);
        self
    }

    #[must_use]
    pub fn notes(mut self, val: Option<String>) -> Self {
        self.0.notes = Some(val);
        self
    }

    #[must_use]
    pub fn build(self) -> PatientUpdate {
        self.0
    }
}

impl Default for PatientUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
