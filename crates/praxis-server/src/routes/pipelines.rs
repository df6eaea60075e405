use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use praxis_core::audit_detail::ReassignedDetail;
use praxis_core::entities::{Lead, Pipeline};
use praxis_db::updates::pipeline::PipelineUpdate;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewPipelineRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Pipeline receiving the deleted pipeline's leads; the default
    /// pipeline when absent.
    pub target: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Pipeline>>, ApiError> {
    Ok(Json(state.service.list_pipelines(user.id()).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<NewPipelineRequest>,
) -> Result<Created<Pipeline>, ApiError> {
    let pipeline = state
        .service
        .create_pipeline(user.id(), &req.name, req.color.as_deref())
        .await?;
    Ok(created(pipeline))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Pipeline>, ApiError> {
    Ok(Json(state.service.get_pipeline(user.id(), &id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<PipelineUpdate>,
) -> Result<Json<Pipeline>, ApiError> {
    Ok(Json(state.service.update_pipeline(user.id(), &id, update).await?))
}

/// `DELETE /api/pipelines/:id?target=`: answers with where the leads went.
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<ReassignedDetail>, ApiError> {
    let detail = state
        .service
        .delete_pipeline(user.id(), &id, query.target.as_deref())
        .await?;
    Ok(Json(detail))
}

pub async fn set_default(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Pipeline>, ApiError> {
    Ok(Json(state.service.set_default_pipeline(user.id(), &id).await?))
}

/// `GET /api/pipelines/:id/leads`: the column, in board order.
pub async fn leads(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    Ok(Json(state.service.list_pipeline_leads(user.id(), &id).await?))
}
