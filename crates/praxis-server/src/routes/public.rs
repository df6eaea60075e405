//! Unauthenticated surface: public pages, indication redirects and the
//! capture endpoints used by embedded forms, quizzes and chatbots.
//!
//! The owning doctor is always resolved from the public identifier (page or
//! indication slug, quiz or flow id, referral code). New leads notify the
//! doctor by mail; a failed notification is logged and never fails the
//! request.

use std::collections::BTreeMap;

use askama::Template;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::header::{LOCATION, REFERER};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};

use praxis_core::chatbot::{entry_node, next_node};
use praxis_core::entities::{ChatbotFlow, ChatbotNode, Lead, QuizWithQuestions};
use praxis_core::enums::{EventKind, LeadSource};
use praxis_db::error::DatabaseError;
use praxis_db::repos::event::NewEvent;
use praxis_db::repos::lead::NewLead;
use praxis_db::repos::quiz::QuizSubmission;
use praxis_db::repos::referral::ReferralContact;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::JsonOrForm;
use crate::mail::OutgoingMail;
use crate::middleware::tracking::visitor_id;
use crate::state::AppState;
use crate::templates::PageTemplate;

const NOT_FOUND_HTML: &str = "<!doctype html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\"><title>Página não encontrada</title></head><body><h1>Página não encontrada</h1></body></html>";

#[derive(Debug, Deserialize)]
pub struct PublicLeadRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub interest: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PublicLeadRequest {
    /// HTML forms post empty strings for untouched inputs.
    fn into_new_lead(self, source: LeadSource) -> NewLead {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        NewLead {
            name: self.name,
            email: clean(self.email),
            phone: clean(self.phone),
            interest: clean(self.interest),
            notes: clean(self.notes),
            source,
            ..Default::default()
        }
    }
}

/// What a visitor gets back after submitting anything.
#[derive(Debug, Serialize)]
pub struct Receipt {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct PublicChatbot {
    pub flow: ChatbotFlow,
    pub entry: Option<ChatbotNode>,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    /// Node being answered; omitted to start the conversation.
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub node: Option<ChatbotNode>,
    pub done: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatbotSubmission {
    /// Answers keyed by node id.
    pub answers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub kind: EventKind,
    #[serde(default)]
    pub page_slug: Option<String>,
    #[serde(default)]
    pub indication_slug: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

fn not_found_html() -> Response {
    (StatusCode::NOT_FOUND, Html(NOT_FOUND_HTML)).into_response()
}

/// Send the doctor a short note about a new lead.
async fn notify_new_lead(state: &AppState, lead: &Lead) {
    let doctor = match state.service.get_user(&lead.user_id).await {
        Ok(user) => user,
        Err(error) => {
            tracing::warn!(%error, lead_id = %lead.id, "cannot load doctor for lead notification");
            return;
        }
    };
    let mut text = format!(
        "Olá, {}.\n\nVocê recebeu um novo contato pelo canal \"{}\".\n\nNome: {}",
        doctor.name,
        lead.source.as_str(),
        lead.name
    );
    for (label, value) in [
        ("E-mail", &lead.email),
        ("Telefone", &lead.phone),
        ("Interesse", &lead.interest),
        ("Mensagem", &lead.notes),
    ] {
        if let Some(value) = value {
            text.push_str(&format!("\n{label}: {value}"));
        }
    }
    text.push_str(&format!("\n\n{}", state.config.server.url_for("/dashboard/leads")));

    let mail = OutgoingMail {
        to: doctor.email,
        subject: format!("Novo lead: {}", lead.name),
        text,
    };
    if let Err(error) = state.mailer.send(mail).await {
        tracing::warn!(%error, lead_id = %lead.id, "lead notification failed");
    }
}

/// `GET /p/:slug`: published pages only.
pub async fn page(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let bundle = match state.service.get_public_page_bundle(&slug).await {
        Ok(bundle) => bundle,
        Err(DatabaseError::NoResult) => return not_found_html(),
        Err(other) => return ApiError::from(other).into_response(),
    };
    match PageTemplate::from_bundle(&bundle).render() {
        Ok(html) => Html(html).into_response(),
        Err(error) => ApiError::Internal(format!("page template: {error}")).into_response(),
    }
}

/// `GET /i/:slug`: 302 to the indication's target, or to the doctor's first
/// published page when it has none. The click itself is counted by the
/// tracking middleware.
pub async fn indication(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let indication = match state.service.get_indication_by_slug(&slug).await {
        Ok(indication) => indication,
        Err(DatabaseError::NoResult) => return Ok(not_found_html()),
        Err(other) => return Err(other.into()),
    };

    let target = match indication.target_url {
        Some(url) => url,
        None => state
            .service
            .list_pages(&indication.user_id)
            .await?
            .into_iter()
            .find(|p| p.published)
            .map_or_else(
                || state.config.server.public_url.clone(),
                |p| state.config.server.url_for(&format!("/p/{}", p.slug)),
            ),
    };
    Ok((StatusCode::FOUND, [(LOCATION, target)]).into_response())
}

/// `POST /api/public/pages/:slug/leads`: JSON or the page's HTML form.
pub async fn page_lead(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonOrForm(req): JsonOrForm<PublicLeadRequest>,
) -> Result<Created<Receipt>, ApiError> {
    let page = state.service.get_page_by_slug(&slug).await?;
    let mut new = req.into_new_lead(LeadSource::Form);
    new.page_id = Some(page.id);

    let lead = state.service.create_lead(&page.user_id, &new).await?;
    notify_new_lead(&state, &lead).await;
    Ok(created(Receipt { id: lead.id }))
}

/// `POST /api/public/indications/:slug/leads`
pub async fn indication_lead(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonOrForm(req): JsonOrForm<PublicLeadRequest>,
) -> Result<Created<Receipt>, ApiError> {
    let indication = state.service.get_indication_by_slug(&slug).await?;
    let mut new = req.into_new_lead(LeadSource::Indication);
    new.indication_id = Some(indication.id);

    let lead = state.service.create_lead(&indication.user_id, &new).await?;
    notify_new_lead(&state, &lead).await;
    Ok(created(Receipt { id: lead.id }))
}

/// `GET /api/public/quizzes/:id`: active quizzes only.
pub async fn quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuizWithQuestions>, ApiError> {
    Ok(Json(state.service.get_public_quiz(&id).await?))
}

/// `POST /api/public/quizzes/:id/submit`
pub async fn submit_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(submission): Json<QuizSubmission>,
) -> Result<Created<Receipt>, ApiError> {
    let lead = state.service.submit_quiz(&id, &submission).await?;
    notify_new_lead(&state, &lead).await;
    Ok(created(Receipt { id: lead.id }))
}

/// `GET /api/public/chatbots/:id`: the flow and its first node.
pub async fn chatbot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PublicChatbot>, ApiError> {
    let graph = state.service.get_active_flow(&id).await?;
    let entry = entry_node(&graph.nodes).cloned();
    Ok(Json(PublicChatbot {
        flow: graph.flow,
        entry,
    }))
}

/// `POST /api/public/chatbots/:id/step`: node that follows an answer.
pub async fn chatbot_step(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StepRequest>,
) -> Result<Json<StepResponse>, ApiError> {
    let graph = state.service.get_active_flow(&id).await?;
    let node = match req.node_id.as_deref() {
        None => entry_node(&graph.nodes),
        Some(current) => {
            if !graph.nodes.iter().any(|n| n.id == current) {
                return Err(ApiError::BadRequest(format!("unknown node '{current}'")));
            }
            next_node(&graph.nodes, &graph.edges, current, req.answer.as_deref())
        }
    }
    .cloned();
    let done = node.is_none();
    Ok(Json(StepResponse { node, done }))
}

/// `POST /api/public/chatbots/:id/submit`
pub async fn submit_chatbot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatbotSubmission>,
) -> Result<Created<Receipt>, ApiError> {
    let lead = state.service.submit_chatbot(&id, &req.answers).await?;
    notify_new_lead(&state, &lead).await;
    Ok(created(Receipt { id: lead.id }))
}

/// `POST /api/public/referrals/:code`: a patient passes on a contact.
pub async fn referral(
    State(state): State<AppState>,
    Path(code): Path<String>,
    JsonOrForm(contact): JsonOrForm<ReferralContact>,
) -> Result<Created<Receipt>, ApiError> {
    let referral = state.service.register_referral(&code, &contact).await?;
    if let Some(lead_id) = referral.lead_id.as_deref() {
        match state.service.get_lead(&referral.user_id, lead_id).await {
            Ok(lead) => notify_new_lead(&state, &lead).await,
            Err(error) => tracing::warn!(%error, lead_id, "referral lead not found for notification"),
        }
    }
    Ok(created(Receipt { id: referral.id }))
}

/// `POST /api/public/track`: client-side analytics from public pages.
pub async fn track(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TrackRequest>,
) -> Result<StatusCode, ApiError> {
    if req.kind == EventKind::LeadCreated {
        return Err(ApiError::BadRequest("lead events are recorded by the server".into()));
    }

    let mut event = NewEvent {
        kind: req.kind,
        path: req.path,
        referrer: headers
            .get(REFERER)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        visitor_id: visitor_id(&headers),
        metadata: req.metadata,
        ..Default::default()
    };
    if let Some(slug) = req.page_slug.as_deref() {
        let page = state.service.get_page_by_slug(slug).await?;
        event.user_id = page.user_id;
        event.page_id = Some(page.id);
    } else if let Some(slug) = req.indication_slug.as_deref() {
        let indication = state.service.get_indication_by_slug(slug).await?;
        event.user_id = indication.user_id;
        event.indication_id = Some(indication.id);
    } else {
        return Err(ApiError::BadRequest(
            "either 'page_slug' or 'indication_slug' is required".into(),
        ));
    }

    state.service.record_event(&event).await?;
    Ok(StatusCode::ACCEPTED)
}
