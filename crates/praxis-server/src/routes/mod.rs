//! Route handlers, one module per resource.
//!
//! Handlers take `State<AppState>`, authenticate with [`CurrentUser`] where
//! the route is private, and return `Result<_, ApiError>`. Creation answers
//! `201`, deletion `204`.
//!
//! [`CurrentUser`]: crate::extract::CurrentUser

pub mod analytics;
pub mod assistant;
pub mod auth;
pub mod calendar;
pub mod chatbots;
pub mod checkpoints;
pub mod clinics;
pub mod eisenhower;
pub mod habits;
pub mod health;
pub mod indications;
pub mod leads;
pub mod pages;
pub mod patients;
pub mod pipelines;
pub mod public;
pub mod quizzes;
pub mod referrals;
pub mod webhooks;

use axum::Json;
use axum::http::StatusCode;
use serde::Deserialize;

/// `201 Created` with a JSON body.
pub type Created<T> = (StatusCode, Json<T>);

pub fn created<T>(value: T) -> Created<T> {
    (StatusCode::CREATED, Json(value))
}

/// Body for the `.../order` endpoints: ids in their new order.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub ids: Vec<String>,
}
