use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use praxis_core::entities::{Quiz, QuizQuestion, QuizWithQuestions};
use praxis_db::repos::quiz::{NewQuestion, NewQuiz};
use praxis_db::updates::quiz::{QuestionUpdate, QuizUpdate};

use super::{Created, OrderRequest, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<Quiz>>, ApiError> {
    Ok(Json(state.service.list_quizzes(user.id()).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewQuiz>,
) -> Result<Created<Quiz>, ApiError> {
    Ok(created(state.service.create_quiz(user.id(), &new).await?))
}

/// `GET /api/quizzes/:id`: with questions in display order.
pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<QuizWithQuestions>, ApiError> {
    Ok(Json(state.service.get_quiz_with_questions(user.id(), &id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<QuizUpdate>,
) -> Result<Json<Quiz>, ApiError> {
    Ok(Json(state.service.update_quiz(user.id(), &id, update).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_quiz(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_question(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(quiz_id): Path<String>,
    Json(new): Json<NewQuestion>,
) -> Result<Created<QuizQuestion>, ApiError> {
    Ok(created(state.service.add_question(user.id(), &quiz_id, &new).await?))
}

pub async fn update_question(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<QuestionUpdate>,
) -> Result<Json<QuizQuestion>, ApiError> {
    Ok(Json(state.service.update_question(user.id(), &id, update).await?))
}

pub async fn delete_question(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_question(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/quizzes/:id/questions/order`
pub async fn reorder_questions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(quiz_id): Path<String>,
    Json(order): Json<OrderRequest>,
) -> Result<Json<Vec<QuizQuestion>>, ApiError> {
    let questions = state
        .service
        .reorder_questions(user.id(), &quiz_id, &order.ids)
        .await?;
    Ok(Json(questions))
}
