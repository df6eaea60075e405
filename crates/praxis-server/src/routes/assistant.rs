//! Writing assistant backed by the configured LLM.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use praxis_core::entities::{Lead, User};

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

const BIO_SYSTEM: &str = "You write short, warm professional bios for doctors' public pages. \
Write in Brazilian Portuguese, in the first person, at most 80 words, with no medical claims \
or promises of results.";

const REPLY_SYSTEM: &str = "You draft the first reply from a doctor's office to a prospective \
patient who left their contact. Write in Brazilian Portuguese, friendly and brief, suggest \
booking an appointment, and never give medical advice.";

#[derive(Debug, Default, Deserialize)]
pub struct BioRequest {
    /// Extra facts to weave in (training, focus areas, languages).
    #[serde(default)]
    pub highlights: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeadReplyRequest {
    pub lead_id: String,
    /// `whatsapp`, `email`, ... shapes the length of the draft.
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub text: String,
}

fn bio_prompt(user: &User, req: &BioRequest) -> String {
    let mut prompt = format!("Doctor: {}", user.name);
    if let Some(specialty) = &user.specialty {
        prompt.push_str(&format!("\nSpecialty: {specialty}"));
    }
    if let Some(highlights) = req.highlights.as_deref().filter(|h| !h.trim().is_empty()) {
        prompt.push_str(&format!("\nHighlights: {highlights}"));
    }
    if let Some(tone) = req.tone.as_deref().filter(|t| !t.trim().is_empty()) {
        prompt.push_str(&format!("\nTone: {tone}"));
    }
    prompt
}

fn lead_reply_prompt(user: &User, lead: &Lead, channel: Option<&str>) -> String {
    let mut prompt = format!(
        "Doctor: {}\nPatient name: {}\nCame from: {}",
        user.name,
        lead.name,
        lead.source.as_str()
    );
    if let Some(interest) = &lead.interest {
        prompt.push_str(&format!("\nInterested in: {interest}"));
    }
    if let Some(notes) = &lead.notes {
        prompt.push_str(&format!("\nTheir message: {notes}"));
    }
    if let Some(channel) = channel {
        prompt.push_str(&format!("\nChannel: {channel}"));
    }
    prompt
}

/// `POST /api/assistant/bio`
pub async fn bio(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<BioRequest>,
) -> Result<Json<Suggestion>, ApiError> {
    let profile = state.service.get_user(user.id()).await?;
    let text = state.llm.complete(BIO_SYSTEM, &bio_prompt(&profile, &req)).await?;
    Ok(Json(Suggestion { text }))
}

/// `POST /api/assistant/lead-reply`
pub async fn lead_reply(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<LeadReplyRequest>,
) -> Result<Json<Suggestion>, ApiError> {
    let profile = state.service.get_user(user.id()).await?;
    let lead = state.service.get_lead(user.id(), &req.lead_id).await?;
    let prompt = lead_reply_prompt(&profile, &lead, req.channel.as_deref());
    let text = state.llm.complete(REPLY_SYSTEM, &prompt).await?;
    Ok(Json(Suggestion { text }))
}
