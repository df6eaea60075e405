#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use praxis_config::PraxisConfig;
use praxis_db::service::PraxisService;
use praxis_server::mail::Mailer;
use praxis_server::{AppState, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub router: Router,
    pub mailer: Mailer,
    pub service: Arc<PraxisService>,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let mut config = PraxisConfig::default();
        config.database.path = ":memory:".into();
        config.server.public_url = "https://praxis.test".into();
        config.payments.webhook_secret = WEBHOOK_SECRET.into();
        Self::with_config(config).await
    }

    pub async fn with_config(config: PraxisConfig) -> Self {
        let service = PraxisService::new_local(":memory:").await.unwrap();
        let mailer = Mailer::memory();
        let state = AppState::new(service, config).unwrap().with_mailer(mailer.clone());
        Self {
            service: Arc::clone(&state.service),
            router: build_router(state),
            mailer,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    /// Register a doctor and return `(token, user_id)`.
    pub async fn register(&self, email: &str, slug: &str) -> (String, String) {
        let reply = self
            .call(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "name": "Dra. Ana Souza",
                    "password": PASSWORD,
                    "slug": slug,
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
        let body = reply.json();
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Create and publish a page; returns its id.
    pub async fn published_page(&self, token: &str, slug: &str) -> String {
        let reply = self
            .call(
                "POST",
                "/api/pages",
                Some(token),
                Some(json!({
                    "title": "Dermatologia Ana Souza",
                    "slug": slug,
                    "bio": "Dermatologista em Curitiba",
                    "published": true,
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
        reply.json()["id"].as_str().unwrap().to_string()
    }
}
