//! Cross-cutting error types for Praxis.
//!
//! Domain-specific errors (`DatabaseError`, `AuthError`, ...) live in their
//! own crates. The HTTP layer folds all of them into `ApiError`.

use thiserror::Error;

/// Errors that can be raised by the pure domain logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// Data failed validation (format, constraints, missing answers).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
