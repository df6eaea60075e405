use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use praxis_core::entities::Checkpoint;
use praxis_db::repos::checkpoint::NewCheckpoint;
use praxis_db::updates::checkpoint::CheckpointUpdate;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Checkpoint>>, ApiError> {
    Ok(Json(state.service.list_checkpoints(user.id()).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewCheckpoint>,
) -> Result<Created<Checkpoint>, ApiError> {
    Ok(created(state.service.create_checkpoint(user.id(), &new).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<CheckpointUpdate>,
) -> Result<Json<Checkpoint>, ApiError> {
    Ok(Json(state.service.update_checkpoint(user.id(), &id, update).await?))
}

/// `POST /api/checkpoints/:id/toggle`
pub async fn toggle(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Checkpoint>, ApiError> {
    Ok(Json(state.service.toggle_checkpoint(user.id(), &id).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_checkpoint(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
