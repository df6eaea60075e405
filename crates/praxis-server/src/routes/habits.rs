//! Habit tracker: habits, daily check-ins and streaks.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use praxis_core::entities::{Habit, HabitStats};
use praxis_db::repos::habit::NewHabit;
use praxis_db::updates::habit::HabitUpdate;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HabitQuery {
    #[serde(default)]
    pub include_archived: bool,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<HabitQuery>,
) -> Result<Json<Vec<Habit>>, ApiError> {
    Ok(Json(state.service.list_habits(user.id(), query.include_archived).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewHabit>,
) -> Result<Created<Habit>, ApiError> {
    Ok(created(state.service.create_habit(user.id(), &new).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<HabitUpdate>,
) -> Result<Json<Habit>, ApiError> {
    Ok(Json(state.service.update_habit(user.id(), &id, update).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_habit(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/habits/:id/check-ins/:date`: repeating a check-in is a no-op.
pub async fn check_in(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, day)): Path<(String, NaiveDate)>,
) -> Result<Json<HabitStats>, ApiError> {
    Ok(Json(state.service.check_in(user.id(), &id, day).await?))
}

/// `DELETE /api/habits/:id/check-ins/:date`
pub async fn undo_check_in(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, day)): Path<(String, NaiveDate)>,
) -> Result<Json<HabitStats>, ApiError> {
    Ok(Json(state.service.undo_check_in(user.id(), &id, day).await?))
}

/// `GET /api/habits/:id/check-ins`
pub async fn check_ins(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<NaiveDate>>, ApiError> {
    Ok(Json(state.service.list_check_ins(user.id(), &id).await?))
}

/// `GET /api/habits/:id/stats`: streak counted up to today (UTC).
pub async fn stats(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<HabitStats>, ApiError> {
    let today = Utc::now().date_naive();
    Ok(Json(state.service.habit_stats(user.id(), &id, today).await?))
}
