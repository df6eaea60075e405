//! Unauthenticated surface: public pages, indication links and capture forms.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::TestApp;
use praxis_config::PraxisConfig;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

/// Hits are recorded on a background task; poll until `check` holds.
async fn eventually(app: &TestApp, token: &str, uri: &str, check: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..50 {
        let body = app.call("GET", uri, Some(token), None).await.json();
        if check(&body) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held for {uri}");
}

async fn event_count(app: &TestApp, token: &str, kind: &str) -> usize {
    let uri = format!("/api/analytics/events?kind={kind}");
    app.call("GET", &uri, Some(token), None)
        .await
        .json()
        .as_array()
        .map_or(0, Vec::len)
}

#[tokio::test]
async fn published_page_renders_html() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    app.published_page(&token, "ana-derma").await;

    let reply = app.call("GET", "/p/ana-derma", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let html = reply.text();
    assert!(html.contains("Dermatologia Ana Souza"));
    assert!(html.contains("ana-derma"));
}

#[tokio::test]
async fn unknown_or_draft_page_is_not_found_html() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    app.call(
        "POST",
        "/api/pages",
        Some(&token),
        Some(json!({ "title": "Rascunho", "slug": "rascunho" })),
    )
    .await;

    for path in ["/p/rascunho", "/p/nao-existe"] {
        let reply = app.call("GET", path, None, None).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(reply.text().contains("Página não encontrada"));
    }
}

#[tokio::test]
async fn form_lead_is_stored_and_doctor_notified() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    app.published_page(&token, "ana-derma").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/public/pages/ana-derma/leads")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("name=Paula+Lima&email=paula%40mail.com&phone=&notes="))
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
    let lead_id = reply.json()["id"].as_str().unwrap().to_string();

    let lead = app.call("GET", &format!("/api/leads/{lead_id}"), Some(&token), None).await;
    assert_eq!(lead.status, StatusCode::OK);
    let lead = lead.json();
    assert_eq!(lead["source"], "form");
    assert_eq!(lead["email"], "paula@mail.com");
    assert!(lead["phone"].is_null());

    let outbox = app.mailer.outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].to, "ana@clinic.com");
    assert!(outbox[0].subject.contains("Paula Lima"));
}

#[tokio::test]
async fn json_lead_without_name_is_rejected() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    app.published_page(&token, "ana-derma").await;

    let reply = app
        .call(
            "POST",
            "/api/public/pages/ana-derma/leads",
            None,
            Some(json!({ "name": "  ", "email": "x@y.com" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(app.mailer.outbox().is_empty());
}

#[tokio::test]
async fn indication_link_redirects_to_target() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    let created = app
        .call(
            "POST",
            "/api/indications",
            Some(&token),
            Some(json!({
                "name": "Instagram bio",
                "slug": "insta",
                "target_url": "https://wa.me/5541999990000",
            })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text());

    let reply = app.call("GET", "/i/insta", None, None).await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(
        reply.headers.get(header::LOCATION).unwrap(),
        "https://wa.me/5541999990000"
    );
}

#[tokio::test]
async fn indication_without_target_falls_back_to_page() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    app.published_page(&token, "ana-derma").await;
    app.call(
        "POST",
        "/api/indications",
        Some(&token),
        Some(json!({ "name": "Panfleto", "slug": "panfleto" })),
    )
    .await;

    let reply = app.call("GET", "/i/panfleto", None, None).await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(
        reply.headers.get(header::LOCATION).unwrap(),
        "https://praxis.test/p/ana-derma"
    );

    let reply = app.call("GET", "/i/sumiu", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn indication_lead_bumps_counter() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    let created = app
        .call(
            "POST",
            "/api/indications",
            Some(&token),
            Some(json!({ "name": "Panfleto", "slug": "panfleto" })),
        )
        .await;
    let id = created.json()["id"].as_str().unwrap().to_string();

    let reply = app
        .call(
            "POST",
            "/api/public/indications/panfleto/leads",
            None,
            Some(json!({ "name": "Rita" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let indication = app.call("GET", &format!("/api/indications/{id}"), Some(&token), None).await;
    assert_eq!(indication.json()["leads_count"], 1);
}

#[tokio::test]
async fn referral_unlocks_reward() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;

    let patient = app
        .call("POST", "/api/patients", Some(&token), Some(json!({ "name": "Maria Silva" })))
        .await
        .json();
    let patient_id = patient["id"].as_str().unwrap().to_string();
    let code = patient["referral_code"].as_str().unwrap().to_string();
    assert!(code.starts_with("MARIA-"));

    let reward = app
        .call(
            "POST",
            &format!("/api/patients/{patient_id}/rewards"),
            Some(&token),
            Some(json!({ "title": "Limpeza de pele", "threshold": 1 })),
        )
        .await;
    assert_eq!(reward.status, StatusCode::CREATED, "{}", reward.text());

    let reply = app
        .call(
            "POST",
            &format!("/api/public/referrals/{code}"),
            None,
            Some(json!({ "name": "Joana", "phone": "+55 41 98888-0000" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());

    let rewards = app
        .call("GET", &format!("/api/patients/{patient_id}/rewards"), Some(&token), None)
        .await
        .json();
    assert!(!rewards[0]["unlocked_at"].is_null());

    let patient = app
        .call("GET", &format!("/api/patients/{patient_id}"), Some(&token), None)
        .await
        .json();
    assert_eq!(patient["referral_count"], 1);
    assert_eq!(app.mailer.outbox().len(), 1);
}

#[tokio::test]
async fn unknown_referral_code_is_not_found() {
    let app = TestApp::new().await;
    let reply = app
        .call(
            "POST",
            "/api/public/referrals/NOPE-0000",
            None,
            Some(json!({ "name": "Joana" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn track_rejects_lead_events() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    app.published_page(&token, "ana-derma").await;

    let reply = app
        .call(
            "POST",
            "/api/public/track",
            None,
            Some(json!({ "kind": "lead_created", "page_slug": "ana-derma" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .call(
            "POST",
            "/api/public/track",
            None,
            Some(json!({ "kind": "custom", "page_slug": "ana-derma", "path": "/p/ana-derma#cta" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn page_view_is_recorded_in_background() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    let page_id = app.published_page(&token, "ana-derma").await;

    let request = Request::builder()
        .uri("/p/ana-derma?utm_source=ig")
        .header(header::REFERER, "https://instagram.com/")
        .body(Body::empty())
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::OK);

    let events = eventually(&app, &token, "/api/analytics/events?kind=page_view", |body| {
        body.as_array().is_some_and(|events| events.len() == 1)
    })
    .await;
    assert_eq!(events[0]["page_id"], page_id.as_str());
    assert_eq!(events[0]["path"], "/p/ana-derma");
    assert_eq!(events[0]["referrer"], "https://instagram.com/");
}

#[tokio::test]
async fn indication_click_bumps_clicks() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    let created = app
        .call(
            "POST",
            "/api/indications",
            Some(&token),
            Some(json!({
                "name": "Instagram bio",
                "slug": "insta",
                "target_url": "https://wa.me/5541999990000",
            })),
        )
        .await;
    let id = created.json()["id"].as_str().unwrap().to_string();
    assert_eq!(created.json()["clicks"], 0);

    let reply = app.call("GET", "/i/insta", None, None).await;
    assert_eq!(reply.status, StatusCode::FOUND);

    eventually(&app, &token, &format!("/api/indications/{id}"), |body| body["clicks"] == 1).await;
    assert_eq!(event_count(&app, &token, "indication_click").await, 1);
}

#[tokio::test]
async fn disabled_tracking_records_nothing() {
    let mut config = PraxisConfig::default();
    config.server.public_url = "https://praxis.test".into();
    config.tracking.enabled = false;
    let app = TestApp::with_config(config).await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    app.published_page(&token, "ana-derma").await;

    let reply = app.call("GET", "/p/ana-derma", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(event_count(&app, &token, "page_view").await, 0);
}

/// An active quiz with a required text question and an optional
/// multiple-choice one; returns `(quiz_id, name_question_id, choice_question_id)`.
async fn quiz_with_questions(app: &TestApp, token: &str) -> (String, String, String) {
    let quiz = app
        .call(
            "POST",
            "/api/quizzes",
            Some(token),
            Some(json!({ "title": "Avaliação de pele" })),
        )
        .await;
    assert_eq!(quiz.status, StatusCode::CREATED, "{}", quiz.text());
    let quiz_id = quiz.json()["id"].as_str().unwrap().to_string();

    let mut ids = Vec::new();
    for question in [
        json!({ "prompt": "Qual a sua queixa?", "kind": "text", "required": true }),
        json!({
            "prompt": "Usa protetor solar?",
            "kind": "multiple_choice",
            "options": ["Sim, às vezes", "Nunca"],
        }),
    ] {
        let reply = app
            .call("POST", &format!("/api/quizzes/{quiz_id}/questions"), Some(token), Some(question))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
        ids.push(reply.json()["id"].as_str().unwrap().to_string());
    }
    let choice = ids.pop().unwrap();
    let text = ids.pop().unwrap();
    (quiz_id, text, choice)
}

#[tokio::test]
async fn public_quiz_lists_questions_in_order() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    let (quiz_id, text_id, choice_id) = quiz_with_questions(&app, &token).await;

    let reply = app.call("GET", &format!("/api/public/quizzes/{quiz_id}"), None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["quiz"]["title"], "Avaliação de pele");
    assert_eq!(body["questions"][0]["id"], text_id.as_str());
    assert_eq!(body["questions"][1]["id"], choice_id.as_str());

    app.call(
        "PATCH",
        &format!("/api/quizzes/{quiz_id}"),
        Some(&token),
        Some(json!({ "active": false })),
    )
    .await;
    let reply = app.call("GET", &format!("/api/public/quizzes/{quiz_id}"), None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quiz_submission_requires_answers_and_creates_lead() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    let (quiz_id, text_id, choice_id) = quiz_with_questions(&app, &token).await;
    let submit = format!("/api/public/quizzes/{quiz_id}/submit");

    let reply = app
        .call(
            "POST",
            &submit,
            None,
            Some(json!({ "name": "Paula", "answers": { choice_id.clone(): "Nunca" } })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(app.mailer.outbox().is_empty());

    let reply = app
        .call(
            "POST",
            &submit,
            None,
            Some(json!({
                "name": "Paula",
                "email": "paula@mail.com",
                "answers": { text_id: "Manchas no rosto", choice_id: "Sim, às vezes" },
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
    let lead_id = reply.json()["id"].as_str().unwrap().to_string();

    let lead = app.call("GET", &format!("/api/leads/{lead_id}"), Some(&token), None).await.json();
    assert_eq!(lead["source"], "quiz");
    assert_eq!(lead["metadata"]["answers"][1]["value"], json!(["Sim, às vezes"]));
    assert!(lead["notes"].as_str().unwrap().contains("Manchas no rosto"));
    assert_eq!(app.mailer.outbox().len(), 1);
}

/// Active flow `start -> name -> phone -> end`; returns the flow id and the
/// stored nodes keyed by their text.
async fn chatbot_flow(app: &TestApp, token: &str) -> (String, Value) {
    let flow = app
        .call(
            "POST",
            "/api/chatbots",
            Some(token),
            Some(json!({ "name": "Boas-vindas", "active": true })),
        )
        .await;
    assert_eq!(flow.status, StatusCode::CREATED, "{}", flow.text());
    let flow_id = flow.json()["id"].as_str().unwrap().to_string();

    let graph = app
        .call(
            "PUT",
            &format!("/api/chatbots/{flow_id}/graph"),
            Some(token),
            Some(json!({
                "nodes": [
                    { "key": "start", "kind": "start", "text": "Olá!" },
                    { "key": "name", "kind": "input", "text": "Seu nome?", "field": "name" },
                    { "key": "phone", "kind": "input", "text": "Seu telefone?", "field": "phone" },
                    { "key": "end", "kind": "end", "text": "Obrigado!" },
                ],
                "edges": [
                    { "source": "start", "target": "name" },
                    { "source": "name", "target": "phone" },
                    { "source": "phone", "target": "end" },
                ],
            })),
        )
        .await;
    assert_eq!(graph.status, StatusCode::OK, "{}", graph.text());
    let mut by_text = serde_json::Map::new();
    for node in graph.json()["nodes"].as_array().unwrap() {
        by_text.insert(node["text"].as_str().unwrap().to_string(), node["id"].clone());
    }
    (flow_id, Value::Object(by_text))
}

#[tokio::test]
async fn chatbot_steps_follow_the_graph() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    let (flow_id, nodes) = chatbot_flow(&app, &token).await;
    let step = format!("/api/public/chatbots/{flow_id}/step");

    let reply = app.call("GET", &format!("/api/public/chatbots/{flow_id}"), None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["entry"]["id"], nodes["Olá!"]);

    let reply = app.call("POST", &step, None, Some(json!({}))).await;
    assert_eq!(reply.json()["node"]["id"], nodes["Olá!"]);

    let reply = app
        .call("POST", &step, None, Some(json!({ "node_id": nodes["Olá!"] })))
        .await;
    assert_eq!(reply.json()["node"]["id"], nodes["Seu nome?"]);
    assert_eq!(reply.json()["done"], false);

    let reply = app
        .call("POST", &step, None, Some(json!({ "node_id": nodes["Obrigado!"] })))
        .await;
    assert_eq!(reply.json()["done"], true);
    assert!(reply.json()["node"].is_null());

    let reply = app
        .call("POST", &step, None, Some(json!({ "node_id": "cbn-missing" })))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chatbot_submission_needs_a_name() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ana@clinic.com", "dra-ana").await;
    let (flow_id, nodes) = chatbot_flow(&app, &token).await;
    let submit = format!("/api/public/chatbots/{flow_id}/submit");
    let name_id = nodes["Seu nome?"].as_str().unwrap().to_string();
    let phone_id = nodes["Seu telefone?"].as_str().unwrap().to_string();

    let reply = app
        .call(
            "POST",
            &submit,
            None,
            Some(json!({ "answers": { phone_id.clone(): "+55 41 97777-0000", name_id.clone(): "  " } })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .call(
            "POST",
            &submit,
            None,
            Some(json!({ "answers": { phone_id: "+55 41 97777-0000", name_id: "Rita" } })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
    let lead_id = reply.json()["id"].as_str().unwrap().to_string();

    let lead = app.call("GET", &format!("/api/leads/{lead_id}"), Some(&token), None).await.json();
    assert_eq!(lead["name"], "Rita");
    assert_eq!(lead["phone"], "+55 41 97777-0000");
    assert_eq!(lead["source"], "chatbot");
    assert_eq!(event_count(&app, &token, "chatbot_completed").await, 1);
}
