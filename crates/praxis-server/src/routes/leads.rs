//! Lead CRUD plus the Kanban move and patient conversion.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use praxis_core::entities::{Lead, Patient};
use praxis_db::repos::lead::{LeadFilter, NewLead};
use praxis_db::updates::lead::LeadUpdate;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub pipeline_id: String,
    pub position: i64,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub lead: Lead,
    pub patient: Patient,
}

/// `GET /api/leads?pipeline_id=&status=&source=&limit=`
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<LeadFilter>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    let limit = state.limit(filter.limit);
    Ok(Json(state.service.list_leads(user.id(), &filter, limit).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewLead>,
) -> Result<Created<Lead>, ApiError> {
    Ok(created(state.service.create_lead(user.id(), &new).await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    Ok(Json(state.service.get_lead(user.id(), &id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<LeadUpdate>,
) -> Result<Json<Lead>, ApiError> {
    Ok(Json(state.service.update_lead(user.id(), &id, update).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_lead(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/leads/:id/move`
pub async fn move_to(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<Lead>, ApiError> {
    let lead = state
        .service
        .move_lead(user.id(), &id, &req.pipeline_id, req.position)
        .await?;
    Ok(Json(lead))
}

/// `POST /api/leads/:id/convert`: a second conversion answers `409`.
pub async fn convert(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let (lead, patient) = state.service.convert_lead(user.id(), &id).await?;
    Ok(Json(ConvertResponse { lead, patient }))
}
