use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use praxis_core::entities::{EisenhowerMatrix, EisenhowerTask};
use praxis_db::repos::eisenhower::NewEisenhowerTask;
use praxis_db::updates::eisenhower::EisenhowerUpdate;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatrixQuery {
    #[serde(default)]
    pub include_done: bool,
}

/// `GET /api/eisenhower`: tasks grouped by quadrant.
pub async fn matrix(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<MatrixQuery>,
) -> Result<Json<EisenhowerMatrix>, ApiError> {
    Ok(Json(state.service.list_matrix(user.id(), query.include_done).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewEisenhowerTask>,
) -> Result<Created<EisenhowerTask>, ApiError> {
    Ok(created(state.service.create_eisenhower_task(user.id(), &new).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<EisenhowerUpdate>,
) -> Result<Json<EisenhowerTask>, ApiError> {
    let task = state
        .service
        .update_eisenhower_task(user.id(), &id, update)
        .await?;
    Ok(Json(task))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_eisenhower_task(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
