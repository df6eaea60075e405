//! Payment webhook: signature checks, plan changes and redelivery.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use common::{TestApp, WEBHOOK_SECRET};
use praxis_auth::webhook::sign;
use praxis_config::PraxisConfig;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn webhook_request(payload: &Value, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhooks/payments")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

fn signed(payload: &Value) -> Request<Body> {
    let signature = sign(payload.to_string().as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp()).unwrap();
    webhook_request(payload, Some(signature))
}

fn checkout(event_id: &str, user_id: &str) -> Value {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": {
            "client_reference_id": user_id,
            "customer": "cus_123",
        }},
    })
}

async fn me(app: &TestApp, token: &str) -> Value {
    app.call("GET", "/api/auth/me", Some(token), None).await.json()
}

#[tokio::test]
async fn checkout_upgrades_plan_once() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("ana@clinic.com", "dra-ana").await;
    let payload = checkout("evt_1", &user_id);

    let reply = app.send(signed(&payload)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text());
    assert_eq!(reply.json(), json!({ "received": true }));

    let user = me(&app, &token).await;
    assert_eq!(user["plan"], "pro");
    assert_eq!(user["subscription_status"], "active");
    assert_eq!(user["payment_customer_id"], "cus_123");

    let reply = app.send(signed(&payload)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["duplicate"], true);
}

#[tokio::test]
async fn failed_apply_is_retried_on_redelivery() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("ana@clinic.com", "dra-ana").await;
    let payload = checkout("evt_1", &user_id);

    app.service
        .db()
        .execute(
            "CREATE TRIGGER freeze_users BEFORE UPDATE ON users
             BEGIN SELECT RAISE(ABORT, 'users frozen'); END",
            (),
        )
        .await
        .unwrap();
    let reply = app.send(signed(&payload)).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(me(&app, &token).await["plan"], "free");

    app.service.db().execute("DROP TRIGGER freeze_users", ()).await.unwrap();
    let reply = app.send(signed(&payload)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text());
    assert_eq!(reply.json(), json!({ "received": true }));
    assert_eq!(me(&app, &token).await["plan"], "pro");
}

#[tokio::test]
async fn cancellation_downgrades_by_customer() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("ana@clinic.com", "dra-ana").await;
    app.send(signed(&checkout("evt_1", &user_id))).await;

    let deleted = json!({
        "id": "evt_2",
        "type": "customer.subscription.deleted",
        "data": { "object": { "customer": "cus_123", "status": "canceled" } },
    });
    let reply = app.send(signed(&deleted)).await;
    assert_eq!(reply.status, StatusCode::OK);

    let user = me(&app, &token).await;
    assert_eq!(user["plan"], "free");
    assert_eq!(user["subscription_status"], "canceled");
}

#[tokio::test]
async fn payment_failure_marks_past_due() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("ana@clinic.com", "dra-ana").await;
    app.send(signed(&checkout("evt_1", &user_id))).await;

    let failed = json!({
        "id": "evt_3",
        "type": "invoice.payment_failed",
        "data": { "object": { "customer": "cus_123" } },
    });
    app.send(signed(&failed)).await;

    let user = me(&app, &token).await;
    assert_eq!(user["subscription_status"], "past_due");
}

#[tokio::test]
async fn unknown_customer_is_acknowledged() {
    let app = TestApp::new().await;
    let payload = json!({
        "id": "evt_9",
        "type": "customer.subscription.deleted",
        "data": { "object": { "customer": "cus_nobody" } },
    });
    let reply = app.send(signed(&payload)).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn bad_or_missing_signature_is_rejected() {
    let app = TestApp::new().await;
    let (_, user_id) = app.register("ana@clinic.com", "dra-ana").await;
    let payload = checkout("evt_1", &user_id);

    let reply = app.send(webhook_request(&payload, None)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let forged = sign(payload.to_string().as_bytes(), "whsec_wrong", Utc::now().timestamp()).unwrap();
    let reply = app.send(webhook_request(&payload, Some(forged))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let stale = sign(
        payload.to_string().as_bytes(),
        WEBHOOK_SECRET,
        Utc::now().timestamp() - 3_600,
    )
    .unwrap();
    let reply = app.send(webhook_request(&payload, Some(stale))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unconfigured_webhook_is_unavailable() {
    let app = TestApp::with_config(PraxisConfig::default()).await;
    let payload = json!({ "id": "evt_1", "type": "ping", "data": { "object": {} } });
    let reply = app.send(webhook_request(&payload, Some("t=1,v1=00".into()))).await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
}
