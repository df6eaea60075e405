use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password too weak: {0}")]
    WeakPassword(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("random source failed: {0}")]
    Random(String),

    #[error("OAuth request failed: {0}")]
    OAuth(String),

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("webhook timestamp outside tolerance")]
    StaleSignature,
}
