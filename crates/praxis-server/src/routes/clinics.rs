//! Outbound prospecting: partner clinics and the contact log.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use praxis_core::entities::{Clinic, Outbound};
use praxis_core::enums::{ClinicStatus, OutboundChannel};
use praxis_db::repos::clinic::{ClinicFilter, NewClinic};
use praxis_db::updates::clinic::ClinicUpdate;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ClinicQuery {
    pub status: Option<ClinicStatus>,
    pub city: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewOutbound {
    pub channel: OutboundChannel,
    pub message: String,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ClinicQuery>,
) -> Result<Json<Vec<Clinic>>, ApiError> {
    let filter = ClinicFilter {
        status: query.status,
        city: query.city,
        search: query.search,
    };
    Ok(Json(state.service.list_clinics(user.id(), &filter).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewClinic>,
) -> Result<Created<Clinic>, ApiError> {
    Ok(created(state.service.create_clinic(user.id(), &new).await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Clinic>, ApiError> {
    Ok(Json(state.service.get_clinic(user.id(), &id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<ClinicUpdate>,
) -> Result<Json<Clinic>, ApiError> {
    Ok(Json(state.service.update_clinic(user.id(), &id, update).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_clinic(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_outbound(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Outbound>>, ApiError> {
    Ok(Json(state.service.list_outbound(user.id(), &id).await?))
}

/// `POST /api/clinics/:id/outbound`: a first contact moves a prospect to
/// `contacted`.
pub async fn log_outbound(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(new): Json<NewOutbound>,
) -> Result<Created<Outbound>, ApiError> {
    let outbound = state
        .service
        .log_outbound(user.id(), &id, new.channel, &new.message)
        .await?;
    Ok(created(outbound))
}
