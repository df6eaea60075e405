//! # praxis-server
//!
//! axum HTTP surface for Praxis: the authenticated JSON API used by the
//! doctor's dashboard, the public capture endpoints (pages, indications,
//! quizzes, chatbots, referrals), the public HTML page renderer, and the
//! payment webhook. The `praxis` binary in `main.rs` wraps it in a CLI.

pub mod error;
pub mod extract;
pub mod llm;
pub mod mail;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
pub mod templates;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
