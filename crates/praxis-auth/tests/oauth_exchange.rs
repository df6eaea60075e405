//! Token endpoint round trips against a local stub server.

use axum::routing::post;
use axum::{Form, Json, Router};
use praxis_auth::AuthError;
use praxis_auth::oauth::{exchange_code, refresh_access_token};
use praxis_config::CalendarConfig;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

async fn token_endpoint(Form(form): Form<HashMap<String, String>>) -> Json<serde_json::Value> {
    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some("good") => {
            Json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 1800,
                "token_type": "Bearer"
            }))
        }
        Some("refresh_token") => Json(serde_json::json!({
            "access_token": format!("access-for-{}", form["refresh_token"]),
            "expires_in": 3600
        })),
        _ => Json(serde_json::json!({ "error": "invalid_grant" })),
    }
}

async fn stub_config() -> CalendarConfig {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/token", post(token_endpoint));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    CalendarConfig {
        client_id: "client".into(),
        client_secret: "secret".into(),
        token_url: format!("http://{addr}/token"),
        ..CalendarConfig::default()
    }
}

#[tokio::test]
async fn code_exchange_returns_tokens() {
    let config = stub_config().await;
    let client = reqwest::Client::new();
    let token = exchange_code(&client, &config, "http://localhost/cb", "good").await.unwrap();
    assert_eq!(token.access_token, "access-1");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(token.expires_in, 1800);
}

#[tokio::test]
async fn rejected_code_is_an_oauth_error() {
    let config = stub_config().await;
    let client = reqwest::Client::new();
    let err = exchange_code(&client, &config, "http://localhost/cb", "bad").await.unwrap_err();
    assert!(matches!(err, AuthError::OAuth(_)));
}

#[tokio::test]
async fn refresh_keeps_no_refresh_token() {
    let config = stub_config().await;
    let client = reqwest::Client::new();
    let token = refresh_access_token(&client, &config, "r1").await.unwrap();
    assert_eq!(token.access_token, "access-for-r1");
    assert_eq!(token.refresh_token, None);
}
