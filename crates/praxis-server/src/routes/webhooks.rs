//! Payment provider webhook receiver.
//!
//! The raw body is verified against the `stripe-signature` header before it
//! is parsed. Each event id is recorded before it is applied, so a
//! redelivered event is acknowledged without touching the account again.
//! If applying fails the record is dropped and the provider's retry is
//! applied normally.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use praxis_auth::webhook::verify_signature;
use praxis_core::entities::User;
use praxis_core::enums::{Plan, SubscriptionStatus};
use praxis_db::error::DatabaseError;

use crate::error::ApiError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

/// Account change requested by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    /// Keep the plan implied by the status.
    Status(SubscriptionStatus),
    Set(Plan, SubscriptionStatus),
}

fn str_field<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// `POST /api/webhooks/payments`
pub async fn payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let payments = &state.config.payments;
    if !payments.is_configured() {
        return Err(ApiError::Unavailable("payment webhooks are not configured".into()));
    }
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("missing {SIGNATURE_HEADER} header")))?;
    verify_signature(
        signature,
        &body,
        &payments.webhook_secret,
        Utc::now().timestamp(),
        payments.tolerance_secs,
    )?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed event: {e}")))?;

    if !state.service.mark_webhook_processed(&event.id, &event.kind).await? {
        tracing::info!(event_id = %event.id, kind = %event.kind, "duplicate webhook ignored");
        return Ok(Json(WebhookAck {
            received: true,
            duplicate: true,
        }));
    }

    if let Err(err) = apply_event(&state, &event).await {
        if let Err(forget_err) = state.service.forget_webhook_event(&event.id).await {
            tracing::error!(event_id = %event.id, error = %forget_err, "could not clear failed webhook");
        }
        return Err(err);
    }
    Ok(Json(WebhookAck {
        received: true,
        duplicate: false,
    }))
}

async fn apply_event(state: &AppState, event: &WebhookEvent) -> Result<(), ApiError> {
    let object = &event.data.object;
    let customer = str_field(object, "customer");

    let (user, change) = match event.kind.as_str() {
        "checkout.session.completed" => {
            let Some(user_id) = str_field(object, "client_reference_id") else {
                tracing::warn!(event_id = %event.id, "checkout without client_reference_id");
                return Ok(());
            };
            let user = find_user(state.service.get_user(user_id).await, &event.id)?;
            (user, Change::Set(Plan::Pro, SubscriptionStatus::Active))
        }
        "customer.subscription.updated" => {
            let status = SubscriptionStatus::from_provider(str_field(object, "status").unwrap_or(""));
            (by_customer(state, customer, &event.id).await?, Change::Status(status))
        }
        "customer.subscription.deleted" => (
            by_customer(state, customer, &event.id).await?,
            Change::Set(Plan::Free, SubscriptionStatus::Canceled),
        ),
        "invoice.payment_failed" => (
            by_customer(state, customer, &event.id).await?,
            Change::Status(SubscriptionStatus::PastDue),
        ),
        other => {
            tracing::debug!(kind = other, "webhook type not handled");
            return Ok(());
        }
    };
    let Some(user) = user else {
        return Ok(());
    };

    let (plan, status) = match change {
        Change::Set(plan, status) => (plan, status),
        Change::Status(status) if status.is_entitled() => (Plan::Pro, status),
        Change::Status(status) => (Plan::Free, status),
    };
    state
        .service
        .set_subscription(&user.id, plan, status, customer, &event.kind)
        .await?;
    Ok(())
}

async fn by_customer(
    state: &AppState,
    customer: Option<&str>,
    event_id: &str,
) -> Result<Option<User>, ApiError> {
    let Some(customer) = customer else {
        tracing::warn!(event_id, "event without customer id");
        return Ok(None);
    };
    find_user(state.service.get_user_by_customer_id(customer).await, event_id)
}

/// An unknown account is logged and the event acknowledged.
fn find_user(
    lookup: Result<User, DatabaseError>,
    event_id: &str,
) -> Result<Option<User>, ApiError> {
    match lookup {
        Ok(user) => Ok(Some(user)),
        Err(DatabaseError::NoResult) => {
            tracing::warn!(event_id, "webhook refers to an unknown account");
            Ok(None)
        }
        Err(other) => Err(other.into()),
    }
}
