//! Fire-and-forget analytics for public page and indication hits.

use axum::extract::{Request, State};
use axum::http::header::REFERER;
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;

use crate::extract::cookie_value;
use crate::state::AppState;

/// Cookie set by the public page script to tell repeat visitors apart.
pub const VISITOR_COOKIE: &str = "praxis_vid";

pub(crate) fn visitor_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-visitor-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .or_else(|| cookie_value(headers, VISITOR_COOKIE))
}

/// Record a tracking event for `GET` requests matching a tracking rule.
///
/// The write happens on a spawned task; the response never waits for it and
/// failures are only logged.
pub async fn track_public_hits(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.method() == Method::GET {
        if let Some(rules) = state.tracking.as_ref() {
            let path = req.uri().path().to_string();
            if let Some(hit) = rules.match_path(&path) {
                let referrer = req
                    .headers()
                    .get(REFERER)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                let visitor = visitor_id(req.headers());
                let service = state.service.clone();

                tokio::spawn(async move {
                    match service
                        .record_tracked_hit(&hit, &path, referrer.as_deref(), visitor.as_deref())
                        .await
                    {
                        Ok(Some(event)) => {
                            tracing::debug!(kind = %event.kind.as_str(), %path, "tracked hit");
                        }
                        Ok(None) => tracing::debug!(%path, "tracked path has no target"),
                        Err(error) => tracing::warn!(%error, %path, "failed to record tracked hit"),
                    }
                });
            }
        }
    }
    next.run(req).await
}
