use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use praxis_core::entities::Indication;
use praxis_db::repos::indication::NewIndication;
use praxis_db::updates::indication::IndicationUpdate;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Indication>>, ApiError> {
    Ok(Json(state.service.list_indications(user.id()).await?))
}

/// `POST /api/indications`: the slug is derived from the name when omitted.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewIndication>,
) -> Result<Created<Indication>, ApiError> {
    Ok(created(state.service.create_indication(user.id(), &new).await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Indication>, ApiError> {
    Ok(Json(state.service.get_indication(user.id(), &id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<IndicationUpdate>,
) -> Result<Json<Indication>, ApiError> {
    Ok(Json(state.service.update_indication(user.id(), &id, update).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_indication(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
