//! Session authentication for API handlers.

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use axum::http::request::Parts;
use axum::{Form, Json};
use chrono::Utc;
use serde::de::DeserializeOwned;

use praxis_auth::token::hash_token;
use praxis_core::identity::TenantIdentity;
use praxis_db::error::DatabaseError;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated doctor. Accepts `Authorization: Bearer <token>` or the
/// session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub TenantIdentity);

impl CurrentUser {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0.user_id
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_value(&parts.headers, &state.config.auth.cookie_name))
            .ok_or(ApiError::Unauthorized)?;

        let session = state
            .service
            .get_session_by_token_hash(&hash_token(&token), Utc::now())
            .await
            .map_err(|e| match e {
                DatabaseError::NoResult => ApiError::Unauthorized,
                other => other.into(),
            })?;
        let user = state.service.get_user(&session.user_id).await.map_err(|e| match e {
            DatabaseError::NoResult => ApiError::Unauthorized,
            other => other.into(),
        })?;

        Ok(Self(TenantIdentity {
            user_id: user.id,
            email: user.email,
            plan: user.plan,
            session_id: session.id,
        }))
    }
}

/// Body accepted as JSON or as an urlencoded HTML form post.
#[derive(Debug, Clone)]
pub struct JsonOrForm<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(Self(value))
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Value of the cookie `name`, if the request carries it.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; praxis_session=tok123; lang=pt"),
        );
        assert_eq!(cookie_value(&headers, "praxis_session").as_deref(), Some("tok123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }
}
