//! Lead update builder.
//!
//! Pipeline and position are not part of the update: moving a lead goes
//! through `move_lead` so the column stays densely ordered.

use praxis_core::enums::LeadStatus;
use serde::{Deserialize, Serialize};

use super::double_option;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadUpdate {
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
    pub interest: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
}

pub struct LeadUpdateBuilder(LeadUpdate);

impl LeadUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(LeadUpdate::default())
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
    pub fn interest(mut self, val: Option<String>) -> Self {
        self.0.interest = Some(val);
        self
    }

    #[must_use]
    pub fn notes(mut self, val: Option<String>) -> Self {
        self.0.notes = Some(val);
        self
    }

    #[must_use]
    pub const fn status(mut self, val: LeadStatus) -> Self {
        self.0.status = Some(val);
        self
    }

    #[must_use]
    pub fn build(self) -> LeadUpdate {
        self.0
    }
}

impl Default for LeadUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
