//! API error type with structured JSON responses.
//!
//! Every error leaves the server as `{"error": {"code": "...", "message": "..."}}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use praxis_auth::AuthError;
use praxis_core::errors::CoreError;
use praxis_db::error::DatabaseError;

use crate::llm::LlmError;
use crate::mail::MailError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    const fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = match &self {
            Self::Unauthorized => "Authentication required".to_string(),
            Self::NotFound => "Resource not found".to_string(),
            Self::Internal(detail) => {
                tracing::error!(detail, "internal error");
                "An internal error occurred".to_string()
            }
            Self::Upstream(detail) => {
                tracing::warn!(detail, "upstream call failed");
                detail.clone()
            }
            Self::BadRequest(m)
            | Self::Validation(m)
            | Self::Conflict(m)
            | Self::InvalidState(m)
            | Self::Unavailable(m) => m.clone(),
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NoResult => Self::NotFound,
            DatabaseError::Conflict(m) => Self::Conflict(m),
            DatabaseError::Validation(m) => Self::Validation(m),
            DatabaseError::InvalidState(m) => Self::InvalidState(m),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        DatabaseError::from(err).into()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::WeakPassword(m) => Self::Validation(format!("password {m}")),
            AuthError::InvalidSignature(m) => Self::BadRequest(format!("invalid signature: {m}")),
            AuthError::StaleSignature => Self::BadRequest("signature timestamp too old".into()),
            AuthError::OAuth(m) => Self::Upstream(m),
            other @ (AuthError::Hashing(_) | AuthError::Random(_)) => {
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NotConfigured => Self::Unavailable("assistant is not configured".into()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self::Upstream(err.to_string())
    }
}
