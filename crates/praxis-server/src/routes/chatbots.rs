use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use praxis_core::chatbot::{EdgeDraft, NodeDraft};
use praxis_core::entities::{ChatbotFlow, ChatbotGraph};
use praxis_db::repos::chatbot::NewFlow;
use praxis_db::updates::chatbot::FlowUpdate;

use super::{Created, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

/// Full editor state; replaces every node and edge of the flow.
#[derive(Debug, Deserialize)]
pub struct GraphRequest {
    #[serde(default)]
    pub nodes: Vec<NodeDraft>,
    #[serde(default)]
    pub edges: Vec<EdgeDraft>,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ChatbotFlow>>, ApiError> {
    Ok(Json(state.service.list_flows(user.id()).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewFlow>,
) -> Result<Created<ChatbotFlow>, ApiError> {
    Ok(created(state.service.create_flow(user.id(), &new).await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ChatbotFlow>, ApiError> {
    Ok(Json(state.service.get_flow(user.id(), &id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<FlowUpdate>,
) -> Result<Json<ChatbotFlow>, ApiError> {
    Ok(Json(state.service.update_flow(user.id(), &id, update).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_flow(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn graph(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ChatbotGraph>, ApiError> {
    Ok(Json(state.service.get_flow_graph(user.id(), &id).await?))
}

/// `PUT /api/chatbots/:id/graph`
pub async fn save_graph(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<GraphRequest>,
) -> Result<Json<ChatbotGraph>, ApiError> {
    let graph = state
        .service
        .save_flow_graph(user.id(), &id, &req.nodes, &req.edges)
        .await?;
    Ok(Json(graph))
}
