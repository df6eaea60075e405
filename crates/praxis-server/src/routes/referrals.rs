//! Patient referrals and the rewards they unlock.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use praxis_core::entities::{PatientReferral, ReferralReward};
use praxis_db::repos::referral::NewReward;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReferralQuery {
    pub patient_id: Option<String>,
}

/// `GET /api/referrals?patient_id=`
pub async fn list_referrals(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ReferralQuery>,
) -> Result<Json<Vec<PatientReferral>>, ApiError> {
    let referrals = state
        .service
        .list_referrals(user.id(), query.patient_id.as_deref())
        .await?;
    Ok(Json(referrals))
}

/// `GET /api/patients/:id/rewards`
pub async fn list_rewards(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<ReferralReward>>, ApiError> {
    Ok(Json(state.service.list_rewards(user.id(), &patient_id).await?))
}

/// `POST /api/patients/:id/rewards`: unlocked immediately when the patient
/// already meets the threshold.
pub async fn create_reward(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<String>,
    Json(new): Json<NewReward>,
) -> Result<Created<ReferralReward>, ApiError> {
    let reward = state
        .service
        .create_reward(user.id(), &patient_id, &new)
        .await?;
    Ok(created(reward))
}

pub async fn redeem_reward(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ReferralReward>, ApiError> {
    Ok(Json(state.service.redeem_reward(user.id(), &id).await?))
}

pub async fn delete_reward(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_reward(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
