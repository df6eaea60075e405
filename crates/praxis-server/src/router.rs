//! Route table.
//!
//! Layers, outermost first: HTTP tracing, CORS, public-hit tracking.
//! Authentication is per handler through the `CurrentUser` extractor.

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{delete, get, patch, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::tracking::track_public_hits;
use crate::routes::{
    analytics, assistant, auth, calendar, chatbots, checkpoints, clinics, eisenhower, habits,
    health, indications, leads, pages, patients, pipelines, public, quizzes, referrals, webhooks,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(auth_routes())
        .merge(crm_routes())
        .merge(page_routes())
        .merge(capture_routes())
        .merge(productivity_routes())
        .merge(integration_routes())
        .merge(public_routes())
        .route("/health", get(health::check))
        .layer(axum::middleware::from_fn_with_state(state.clone(), track_public_hits))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me).patch(auth::update_me))
        .route("/api/auth/password-reset", post(auth::request_reset))
        .route("/api/auth/password-reset/confirm", post(auth::confirm_reset))
}

/// Patients, leads, pipelines, indications and referrals.
fn crm_routes() -> Router<AppState> {
    Router::new()
        .route("/api/patients", get(patients::list).post(patients::create))
        .route(
            "/api/patients/:id",
            get(patients::get).patch(patients::update).delete(patients::delete),
        )
        .route(
            "/api/patients/:id/rewards",
            get(referrals::list_rewards).post(referrals::create_reward),
        )
        .route("/api/rewards/:id/redeem", post(referrals::redeem_reward))
        .route("/api/rewards/:id", delete(referrals::delete_reward))
        .route("/api/referrals", get(referrals::list_referrals))
        .route("/api/leads", get(leads::list).post(leads::create))
        .route(
            "/api/leads/:id",
            get(leads::get).patch(leads::update).delete(leads::delete),
        )
        .route("/api/leads/:id/move", post(leads::move_to))
        .route("/api/leads/:id/convert", post(leads::convert))
        .route("/api/pipelines", get(pipelines::list).post(pipelines::create))
        .route(
            "/api/pipelines/:id",
            get(pipelines::get).patch(pipelines::update).delete(pipelines::delete),
        )
        .route("/api/pipelines/:id/leads", get(pipelines::leads))
        .route("/api/pipelines/:id/default", post(pipelines::set_default))
        .route("/api/indications", get(indications::list).post(indications::create))
        .route(
            "/api/indications/:id",
            get(indications::get)
                .patch(indications::update)
                .delete(indications::delete),
        )
}

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/api/pages", get(pages::list).post(pages::create))
        .route(
            "/api/pages/:id",
            get(pages::get).patch(pages::update).delete(pages::delete),
        )
        .route(
            "/api/pages/:id/blocks",
            get(pages::list_blocks).post(pages::add_block),
        )
        .route("/api/pages/:id/blocks/order", put(pages::reorder_blocks))
        .route(
            "/api/pages/:id/social-links",
            get(pages::list_social_links).post(pages::add_social_link),
        )
        .route(
            "/api/pages/:id/addresses",
            get(pages::list_addresses).post(pages::add_address),
        )
        .route(
            "/api/pages/:id/interests",
            get(pages::list_interests).post(pages::add_interest),
        )
        .route(
            "/api/blocks/:id",
            patch(pages::update_block).delete(pages::delete_block),
        )
        .route("/api/social-links/:id", delete(pages::delete_social_link))
        .route(
            "/api/addresses/:id",
            patch(pages::update_address).delete(pages::delete_address),
        )
        .route("/api/addresses/:id/default", post(pages::set_default_address))
        .route("/api/interests/:id", delete(pages::delete_interest))
        .route("/api/interests/:id/default", post(pages::set_default_interest))
}

/// Chatbot flows, quizzes and analytics.
fn capture_routes() -> Router<AppState> {
    Router::new()
        .route("/api/chatbots", get(chatbots::list).post(chatbots::create))
        .route(
            "/api/chatbots/:id",
            get(chatbots::get).patch(chatbots::update).delete(chatbots::delete),
        )
        .route(
            "/api/chatbots/:id/graph",
            get(chatbots::graph).put(chatbots::save_graph),
        )
        .route("/api/quizzes", get(quizzes::list).post(quizzes::create))
        .route(
            "/api/quizzes/:id",
            get(quizzes::get).patch(quizzes::update).delete(quizzes::delete),
        )
        .route("/api/quizzes/:id/questions", post(quizzes::add_question))
        .route("/api/quizzes/:id/questions/order", put(quizzes::reorder_questions))
        .route(
            "/api/questions/:id",
            patch(quizzes::update_question).delete(quizzes::delete_question),
        )
        .route("/api/analytics/summary", get(analytics::summary))
        .route("/api/analytics/series", get(analytics::series))
        .route("/api/analytics/events", get(analytics::events))
        .route("/api/analytics/pivot", post(analytics::pivot))
        .route("/api/analytics/pivot/move", post(analytics::pivot_move))
        .route("/api/analytics/pivot/remove", post(analytics::pivot_remove))
}

fn productivity_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/checkpoints",
            get(checkpoints::list).post(checkpoints::create),
        )
        .route(
            "/api/checkpoints/:id",
            patch(checkpoints::update).delete(checkpoints::delete),
        )
        .route("/api/checkpoints/:id/toggle", post(checkpoints::toggle))
        .route("/api/habits", get(habits::list).post(habits::create))
        .route(
            "/api/habits/:id",
            patch(habits::update).delete(habits::delete),
        )
        .route("/api/habits/:id/check-ins", get(habits::check_ins))
        .route(
            "/api/habits/:id/check-ins/:date",
            post(habits::check_in).delete(habits::undo_check_in),
        )
        .route("/api/habits/:id/stats", get(habits::stats))
        .route(
            "/api/eisenhower",
            get(eisenhower::matrix).post(eisenhower::create),
        )
        .route(
            "/api/eisenhower/:id",
            patch(eisenhower::update).delete(eisenhower::delete),
        )
        .route("/api/clinics", get(clinics::list).post(clinics::create))
        .route(
            "/api/clinics/:id",
            get(clinics::get).patch(clinics::update).delete(clinics::delete),
        )
        .route(
            "/api/clinics/:id/outbound",
            get(clinics::list_outbound).post(clinics::log_outbound),
        )
}

/// Calendar, assistant and payment webhook.
fn integration_routes() -> Router<AppState> {
    Router::new()
        .route("/api/calendar", delete(calendar::disconnect))
        .route("/api/calendar/connect", get(calendar::connect))
        .route("/api/calendar/callback", get(calendar::callback))
        .route(
            "/api/calendar/events",
            get(calendar::list_events).post(calendar::create_event),
        )
        .route("/api/assistant/bio", post(assistant::bio))
        .route("/api/assistant/lead-reply", post(assistant::lead_reply))
        .route("/api/webhooks/payments", post(webhooks::payments))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/p/:slug", get(public::page))
        .route("/i/:slug", get(public::indication))
        .route("/api/public/pages/:slug/leads", post(public::page_lead))
        .route(
            "/api/public/indications/:slug/leads",
            post(public::indication_lead),
        )
        .route("/api/public/quizzes/:id", get(public::quiz))
        .route("/api/public/quizzes/:id/submit", post(public::submit_quiz))
        .route("/api/public/chatbots/:id", get(public::chatbot))
        .route("/api/public/chatbots/:id/step", post(public::chatbot_step))
        .route("/api/public/chatbots/:id/submit", post(public::submit_chatbot))
        .route("/api/public/referrals/:code", post(public::referral))
        .route("/api/public/track", post(public::track))
}

/// Configured origins may call the API with credentials; without any, CORS
/// stays closed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(origin = %o, %error, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
