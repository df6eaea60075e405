//! # praxis-auth
//!
//! Credential handling for Praxis: Argon2id password hashes, opaque session
//! tokens (only their SHA-256 digests are stored), the Google Calendar OAuth
//! code flow, and HMAC verification of payment webhooks.

pub mod error;
pub mod oauth;
pub mod password;
pub mod token;
pub mod webhook;

pub use error::AuthError;
