//! Authenticated API flows driven through the full router.

mod common;

use std::collections::HashMap;

use axum::http::{StatusCode, header};
use axum::routing::post;
use axum::{Form, Json, Router};
use common::{PASSWORD, TestApp};
use praxis_config::PraxisConfig;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;
    let reply = app.call("GET", "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "ok");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("ana@clinic.com", "dra-ana").await;

    let me = app.call("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["id"], user_id.as_str());
    assert_eq!(me.json()["plan"], "free");

    let login = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@clinic.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.headers.get("set-cookie").is_some());
    assert_eq!(login.json()["user"]["slug"], "dra-ana");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    app.register("ana@clinic.com", "dra-ana").await;

    let reply = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@clinic.com", "password": "not-the-password" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = TestApp::new().await;
    app.register("ana@clinic.com", "dra-ana").await;

    let reply = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "ana@clinic.com",
                "name": "Outra Ana",
                "password": PASSWORD,
                "slug": "outra-ana",
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = TestApp::new().await;
    let reply = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "a@b.com", "name": "A", "password": "short" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_requires_a_session() {
    let app = TestApp::new().await;

    let reply = app.call("GET", "/api/patients", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.call("GET", "/api/patients", Some("bogus-token"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;

    let reply = app.call("POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = app.call("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_round_trip() {
    let app = TestApp::new().await;
    let (old_token, _) = app.register("ana@clinic.com", "dra-ana").await;

    let reply = app
        .call(
            "POST",
            "/api/auth/password-reset",
            None,
            Some(json!({ "email": "ana@clinic.com" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::ACCEPTED);

    let outbox = app.mailer.outbox();
    assert_eq!(outbox.len(), 1);
    let reset_token = outbox[0]
        .text
        .split("token=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap()
        .to_string();

    let reply = app
        .call(
            "POST",
            "/api/auth/password-reset/confirm",
            None,
            Some(json!({ "token": reset_token, "password": "a-brand-new-secret" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = app.call("GET", "/api/auth/me", Some(&old_token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let login = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@clinic.com", "password": "a-brand-new-secret" })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);

    // Tokens are single use.
    let reply = app
        .call(
            "POST",
            "/api/auth/password-reset/confirm",
            None,
            Some(json!({ "token": reset_token, "password": "yet-another-secret" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_for_unknown_email_is_accepted_silently() {
    let app = TestApp::new().await;
    let reply = app
        .call(
            "POST",
            "/api/auth/password-reset",
            None,
            Some(json!({ "email": "nobody@clinic.com" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::ACCEPTED);
    assert!(app.mailer.outbox().is_empty());
}

#[tokio::test]
async fn patient_crud_flow() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;

    let created = app
        .call(
            "POST",
            "/api/patients",
            Some(&token),
            Some(json!({ "name": "Carla Mendes", "phone": "+55 41 99999-0000" })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.json()["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("pat-"));

    let updated = app
        .call(
            "PATCH",
            &format!("/api/patients/{id}"),
            Some(&token),
            Some(json!({ "email": "carla@mail.com", "phone": null })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["email"], "carla@mail.com");
    assert!(updated.json()["phone"].is_null());

    let listed = app.call("GET", "/api/patients?search=carla", Some(&token), None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.json().as_array().unwrap().len(), 1);

    let deleted = app.call("DELETE", &format!("/api/patients/{id}"), Some(&token), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let missing = app.call("GET", &format!("/api/patients/{id}"), Some(&token), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json()["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn tenants_cannot_see_each_other() {
    let app = TestApp::new().await;
    let (ana, _) = app.register("ana@clinic.com", "dra-ana").await;
    let (bruno, _) = app.register("bruno@clinic.com", "dr-bruno").await;

    let created = app
        .call("POST", "/api/patients", Some(&ana), Some(json!({ "name": "Carla" })))
        .await;
    let id = created.json()["id"].as_str().unwrap().to_string();

    let reply = app.call("GET", &format!("/api/patients/{id}"), Some(&bruno), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app.call("GET", "/api/patients", Some(&bruno), None).await;
    assert_eq!(reply.json().as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn lead_conversion_creates_patient() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;

    let lead = app
        .call(
            "POST",
            "/api/leads",
            Some(&token),
            Some(json!({ "name": "Paula Lima", "email": "paula@mail.com" })),
        )
        .await;
    assert_eq!(lead.status, StatusCode::CREATED, "{}", lead.text());
    let lead_id = lead.json()["id"].as_str().unwrap().to_string();
    assert_eq!(lead.json()["status"], "new");

    let converted = app
        .call("POST", &format!("/api/leads/{lead_id}/convert"), Some(&token), None)
        .await;
    assert_eq!(converted.status, StatusCode::OK, "{}", converted.text());
    let body = converted.json();
    assert_eq!(body["patient"]["name"], "Paula Lima");
    assert_eq!(body["lead"]["status"], "converted");
}

#[tokio::test]
async fn new_account_has_default_pipeline() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;

    let pipelines = app.call("GET", "/api/pipelines", Some(&token), None).await;
    assert_eq!(pipelines.status, StatusCode::OK);
    let list = pipelines.json();
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["is_default"], true);
    assert_eq!(list[0]["name"], "New leads");
}

#[tokio::test]
async fn analytics_rejects_half_open_range() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;

    let reply = app
        .call("GET", "/api/analytics/summary?from=2026-01-01T00:00:00Z", Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app.call("GET", "/api/analytics/summary?days=7", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn list_limit_is_capped_by_config() {
    let mut config = PraxisConfig::default();
    config.general.default_limit = 2;
    config.general.max_limit = 2;
    let app = TestApp::with_config(config).await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    for name in ["Ana", "Bia", "Cris"] {
        let reply = app
            .call("POST", "/api/leads", Some(&token), Some(json!({ "name": name })))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    for uri in ["/api/leads?limit=100000", "/api/analytics/events?limit=100000"] {
        let reply = app.call("GET", uri, Some(&token), None).await;
        assert_eq!(reply.status, StatusCode::OK, "{uri}");
        assert_eq!(reply.json().as_array().unwrap().len(), 2, "{uri}");
    }
}

async fn token_endpoint(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    if form.get("code").map(String::as_str) == Some("good") {
        Json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
        }))
    } else {
        Json(json!({ "error": "invalid_grant" }))
    }
}

/// App whose calendar token endpoint is a local stub.
async fn calendar_app() -> TestApp {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stub = Router::new().route("/token", post(token_endpoint));
    tokio::spawn(async move {
        axum::serve(listener, stub).await.unwrap();
    });

    let mut config = PraxisConfig::default();
    config.server.public_url = "https://praxis.test".into();
    config.calendar.client_id = "client".into();
    config.calendar.client_secret = "secret".into();
    config.calendar.token_url = format!("http://{addr}/token");
    TestApp::with_config(config).await
}

#[tokio::test]
async fn calendar_callback_consumes_state_once() {
    let app = calendar_app().await;
    let (token, user_id) = app.register("ana@clinic.com", "dra-ana").await;

    let connect = app.call("GET", "/api/calendar/connect", Some(&token), None).await;
    assert_eq!(connect.status, StatusCode::OK, "{}", connect.text());
    let url = connect.json()["url"].as_str().unwrap().to_string();
    assert!(url.contains("redirect_uri=https%3A%2F%2Fpraxis.test%2Fapi%2Fcalendar%2Fcallback"));
    let oauth_state = url
        .split("state=")
        .nth(1)
        .and_then(|rest| rest.split('&').next())
        .unwrap()
        .to_string();

    let callback = format!("/api/calendar/callback?code=good&state={oauth_state}");
    let reply = app.call("GET", &callback, None, None).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER, "{}", reply.text());
    assert_eq!(
        reply.headers.get(header::LOCATION).unwrap(),
        "https://praxis.test/dashboard?calendar=connected"
    );
    let creds = app.service.get_calendar_credentials(&user_id).await.unwrap();
    assert_eq!(creds.access_token, "access-1");
    assert_eq!(creds.refresh_token.as_deref(), Some("refresh-1"));

    let replay = app.call("GET", &callback, None, None).await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);

    let reply = app
        .call("GET", "/api/calendar/callback?code=good&state=forged", None, None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn calendar_consent_denied_redirects() {
    let app = calendar_app().await;
    let reply = app
        .call("GET", "/api/calendar/callback?error=access_denied", None, None)
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(
        reply.headers.get(header::LOCATION).unwrap(),
        "https://praxis.test/dashboard?calendar=denied"
    );
}

#[tokio::test]
async fn calendar_requires_configuration() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    let reply = app.call("GET", "/api/calendar/connect", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
}
