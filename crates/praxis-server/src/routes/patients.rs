use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use praxis_core::entities::Patient;
use praxis_db::repos::patient::NewPatient;
use praxis_db::updates::patient::PatientUpdate;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PatientQuery {
    /// Matched against name, email and phone.
    pub search: Option<String>,
    pub limit: Option<u32>,
}

/// `GET /api/patients`
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PatientQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let patients = state
        .service
        .list_patients(user.id(), search, state.limit(query.limit))
        .await?;
    Ok(Json(patients))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewPatient>,
) -> Result<Created<Patient>, ApiError> {
    Ok(created(state.service.create_patient(user.id(), &new).await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.service.get_patient(user.id(), &id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<PatientUpdate>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.service.update_patient(user.id(), &id, update).await?))
}

/// `DELETE /api/patients/:id`: leads keep their rows with `patient_id`
/// cleared.
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_patient(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
