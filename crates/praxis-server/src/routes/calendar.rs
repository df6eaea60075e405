//! Calendar integration: OAuth connect/callback and event passthrough.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use praxis_auth::oauth::{authorization_url, exchange_code, refresh_access_token};
use praxis_auth::token::generate_state;
use praxis_core::entities::CalendarCredentials;
use praxis_db::error::DatabaseError;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

/// How long a doctor has to finish the consent screen.
const STATE_TTL_MINUTES: i64 = 10;
/// Access tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NewCalendarEvent {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub attendee_email: Option<String>,
}

fn ensure_configured(state: &AppState) -> Result<(), ApiError> {
    if state.config.calendar.is_configured() {
        Ok(())
    } else {
        Err(ApiError::Unavailable("calendar integration is not configured".into()))
    }
}

/// `GET /api/calendar/connect`: consent URL for the provider.
pub async fn connect(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ConnectResponse>, ApiError> {
    ensure_configured(&state)?;
    let oauth_state = generate_state()?;
    let expires_at = Utc::now() + Duration::minutes(STATE_TTL_MINUTES);
    state
        .service
        .create_oauth_state(user.id(), &oauth_state, expires_at)
        .await?;

    let url = authorization_url(
        &state.config.calendar,
        &state.config.calendar_redirect_url(),
        &oauth_state,
    );
    Ok(Json(ConnectResponse { url }))
}

/// `GET /api/calendar/callback`: the provider redirects the browser here.
/// The doctor is identified by the single-use `state`, not the session.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, ApiError> {
    ensure_configured(&state)?;
    if let Some(error) = query.error {
        tracing::info!(%error, "calendar consent declined");
        return Ok(Redirect::to(&state.config.server.url_for("/dashboard?calendar=denied")));
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Err(ApiError::BadRequest("missing 'code' or 'state'".into()));
    };

    let now = Utc::now();
    let user_id = state
        .service
        .consume_oauth_state(&oauth_state, now)
        .await
        .map_err(|e| match e {
            DatabaseError::NoResult => ApiError::BadRequest("unknown or expired OAuth state".into()),
            other => other.into(),
        })?;

    let tokens = exchange_code(
        &state.http,
        &state.config.calendar,
        &state.config.calendar_redirect_url(),
        &code,
    )
    .await?;
    state
        .service
        .save_calendar_credentials(&CalendarCredentials {
            user_id: user_id.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: tokens.expires_at(now),
            scope: tokens.scope.clone(),
            updated_at: now,
        })
        .await?;

    tracing::info!(%user_id, "calendar connected");
    Ok(Redirect::to(&state.config.server.url_for("/dashboard?calendar=connected")))
}

/// `DELETE /api/calendar`
pub async fn disconnect(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.service.delete_calendar_credentials(user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A usable access token, refreshing and persisting it when it is about to
/// expire.
async fn access_token(state: &AppState, user_id: &str) -> Result<String, ApiError> {
    let creds = state
        .service
        .get_calendar_credentials(user_id)
        .await
        .map_err(|e| match e {
            DatabaseError::NoResult => ApiError::InvalidState("calendar is not connected".into()),
            other => other.into(),
        })?;

    let now = Utc::now();
    if !creds.is_expired(now, REFRESH_MARGIN_SECS) {
        return Ok(creds.access_token);
    }
    let Some(refresh_token) = creds.refresh_token.as_deref() else {
        return Err(ApiError::InvalidState(
            "calendar token expired; reconnect the calendar".into(),
        ));
    };

    let tokens = refresh_access_token(&state.http, &state.config.calendar, refresh_token).await?;
    let refreshed = CalendarCredentials {
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone().or(creds.refresh_token.clone()),
        expires_at: tokens.expires_at(now),
        scope: tokens.scope.clone().or(creds.scope.clone()),
        updated_at: now,
        ..creds
    };
    state.service.save_calendar_credentials(&refreshed).await?;
    tracing::debug!(%user_id, "calendar token refreshed");
    Ok(refreshed.access_token)
}

fn events_url(state: &AppState) -> String {
    format!(
        "{}/calendars/primary/events",
        state.config.calendar.api_base.trim_end_matches('/')
    )
}

async fn provider_json(resp: reqwest::Response) -> Result<Value, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Upstream(format!("calendar API returned {status}: {body}")));
    }
    resp.json()
        .await
        .map_err(|e| ApiError::Upstream(format!("calendar API returned invalid JSON: {e}")))
}

/// `GET /api/calendar/events?from=&to=`: upcoming events, provider format.
pub async fn list_events(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Value>, ApiError> {
    let token = access_token(&state, user.id()).await?;
    let from = query.from.unwrap_or_else(Utc::now);
    let mut params = vec![
        ("singleEvents", "true".to_string()),
        ("orderBy", "startTime".to_string()),
        ("timeMin", from.to_rfc3339()),
        ("maxResults", query.max_results.unwrap_or(50).min(250).to_string()),
    ];
    if let Some(to) = query.to {
        params.push(("timeMax", to.to_rfc3339()));
    }
    let query_string = params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    let resp = state
        .http
        .get(format!("{}?{query_string}", events_url(&state)))
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| ApiError::Upstream(format!("calendar API request failed: {e}")))?;
    let body = provider_json(resp).await?;
    Ok(Json(body.get("items").cloned().unwrap_or_else(|| json!([]))))
}

/// `POST /api/calendar/events`
pub async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewCalendarEvent>,
) -> Result<Created<Value>, ApiError> {
    if new.summary.trim().is_empty() {
        return Err(ApiError::Validation("summary is required".into()));
    }
    if new.end <= new.start {
        return Err(ApiError::Validation("event must end after it starts".into()));
    }

    let token = access_token(&state, user.id()).await?;
    let mut body = json!({
        "summary": new.summary,
        "start": { "dateTime": new.start.to_rfc3339() },
        "end": { "dateTime": new.end.to_rfc3339() },
    });
    if let Some(description) = new.description {
        body["description"] = json!(description);
    }
    if let Some(email) = new.attendee_email {
        body["attendees"] = json!([{ "email": email }]);
    }

    let resp = state
        .http
        .post(events_url(&state))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .map_err(|e| ApiError::Upstream(format!("calendar API request failed: {e}")))?;
    Ok(created(provider_json(resp).await?))
}
