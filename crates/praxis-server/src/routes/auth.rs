//! Registration, login and password reset.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use praxis_auth::password::{hash_password, validate_password, verify_password};
use praxis_auth::token::{generate_token, hash_token};
use praxis_core::entities::User;
use praxis_db::error::DatabaseError;
use praxis_db::repos::user::NewUser;
use praxis_db::updates::user::UserUpdate;

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::mail::OutgoingMail;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetConfirm {
    pub token: String,
    pub password: String,
}

fn session_cookie(state: &AppState, token: &str, max_age_secs: i64) -> String {
    let mut cookie = format!(
        "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}",
        state.config.auth.cookie_name
    );
    if state.config.auth.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Issue a session for `user`: bearer token in the body, same token in a
/// cookie for the browser.
async fn start_session(
    state: &AppState,
    user: User,
    status: StatusCode,
) -> Result<impl IntoResponse + use<>, ApiError> {
    let token = generate_token()?;
    let ttl = Duration::hours(state.config.auth.session_ttl_hours);
    let expires_at = Utc::now() + ttl;
    state
        .service
        .create_session(&user.id, &hash_token(&token), expires_at)
        .await?;

    let cookie = session_cookie(state, &token, ttl.num_seconds());
    Ok((
        status,
        [(SET_COOKIE, cookie)],
        Json(SessionResponse {
            token,
            expires_at,
            user,
        }),
    ))
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_password(&req.password)?;
    let password_hash = hash_password(&req.password)?;
    let user = state
        .service
        .create_user(&NewUser {
            email: req.email,
            name: req.name,
            slug: req.slug,
            password_hash,
            specialty: req.specialty,
            phone: req.phone,
        })
        .await?;
    start_session(&state, user, StatusCode::CREATED).await
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, hash) = state.service.get_login(&req.email).await.map_err(|e| match e {
        DatabaseError::NoResult => ApiError::Unauthorized,
        other => other.into(),
    })?;
    if !verify_password(&req.password, &hash) {
        tracing::debug!(user_id = %user.id, "login rejected");
        return Err(ApiError::Unauthorized);
    }
    start_session(&state, user, StatusCode::OK).await
}

/// `POST /api/auth/logout`: ends the current session only.
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state
        .service
        .delete_session(user.id(), &user.0.session_id)
        .await?;
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, session_cookie(&state, "", 0))]))
}

/// `GET /api/auth/me`
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<User>, ApiError> {
    Ok(Json(state.service.get_user(user.id()).await?))
}

/// `PATCH /api/auth/me`
pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.service.update_user(user.id(), update).await?))
}

/// `POST /api/auth/password-reset`
///
/// Always answers `202` so the endpoint does not reveal which emails are
/// registered.
pub async fn request_reset(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> Result<StatusCode, ApiError> {
    let user = match state.service.get_user_by_email(&req.email).await {
        Ok(user) => user,
        Err(DatabaseError::NoResult) => return Ok(StatusCode::ACCEPTED),
        Err(other) => return Err(other.into()),
    };

    let token = generate_token()?;
    let expires_at = Utc::now() + Duration::minutes(state.config.auth.reset_token_ttl_minutes);
    state
        .service
        .create_reset_token(&user.id, &hash_token(&token), expires_at)
        .await?;

    let link = state
        .config
        .server
        .url_for(&format!("/reset-password?token={token}"));
    let mail = OutgoingMail {
        to: user.email.clone(),
        subject: "Redefinição de senha".to_string(),
        text: format!(
            "Olá, {}.\n\nPara criar uma nova senha acesse:\n{link}\n\nO link expira em {} minutos.",
            user.name, state.config.auth.reset_token_ttl_minutes
        ),
    };
    if let Err(error) = state.mailer.send(mail).await {
        tracing::warn!(%error, user_id = %user.id, "failed to send reset mail");
    }
    Ok(StatusCode::ACCEPTED)
}

/// `POST /api/auth/password-reset/confirm`: sets the new password and ends
/// every open session of the account.
pub async fn confirm_reset(
    State(state): State<AppState>,
    Json(req): Json<ResetConfirm>,
) -> Result<StatusCode, ApiError> {
    validate_password(&req.password)?;
    let user_id = state
        .service
        .consume_reset_token(&hash_token(&req.token), Utc::now())
        .await
        .map_err(|e| match e {
            DatabaseError::NoResult => ApiError::BadRequest("invalid or expired reset token".into()),
            other => other.into(),
        })?;

    let password_hash = hash_password(&req.password)?;
    state.service.set_password(&user_id, &password_hash).await?;
    let ended = state.service.delete_sessions_for_user(&user_id).await?;
    tracing::info!(%user_id, ended, "password reset");
    Ok(StatusCode::NO_CONTENT)
}
