//! Page builder: pages and their blocks, social links, addresses and
//! interest options.
//!
//! Children are created under `/api/pages/:id/...` and addressed directly by
//! their own id afterwards (`/api/blocks/:id`, `/api/addresses/:id`, ...).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use praxis_core::entities::{Address, InterestOption, Page, PageBlock, PageBundle, SocialLink};
use praxis_db::repos::page::NewPage;
use praxis_db::repos::page_children::{NewAddress, NewBlock, NewSocialLink};
use praxis_db::updates::page::{AddressUpdate, BlockUpdate, PageUpdate};

use super::{Created, OrderRequest, created};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewInterest {
    pub label: String,
}

pub async fn list(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<Page>>, ApiError> {
    Ok(Json(state.service.list_pages(user.id()).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewPage>,
) -> Result<Created<Page>, ApiError> {
    Ok(created(state.service.create_page(user.id(), &new).await?))
}

/// `GET /api/pages/:id`: the page with all of its children.
pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PageBundle>, ApiError> {
    Ok(Json(state.service.get_page_bundle(user.id(), &id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<PageUpdate>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(state.service.update_page(user.id(), &id, update).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_page(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Blocks

pub async fn list_blocks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(page_id): Path<String>,
) -> Result<Json<Vec<PageBlock>>, ApiError> {
    Ok(Json(state.service.list_blocks(user.id(), &page_id).await?))
}

pub async fn add_block(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(page_id): Path<String>,
    Json(new): Json<NewBlock>,
) -> Result<Created<PageBlock>, ApiError> {
    Ok(created(state.service.add_block(user.id(), &page_id, &new).await?))
}

pub async fn update_block(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<BlockUpdate>,
) -> Result<Json<PageBlock>, ApiError> {
    Ok(Json(state.service.update_block(user.id(), &id, update).await?))
}

pub async fn delete_block(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_block(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/pages/:id/blocks/order`
pub async fn reorder_blocks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(page_id): Path<String>,
    Json(order): Json<OrderRequest>,
) -> Result<Json<Vec<PageBlock>>, ApiError> {
    let blocks = state
        .service
        .reorder_blocks(user.id(), &page_id, &order.ids)
        .await?;
    Ok(Json(blocks))
}

// Social links

pub async fn list_social_links(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(page_id): Path<String>,
) -> Result<Json<Vec<SocialLink>>, ApiError> {
    Ok(Json(state.service.list_social_links(user.id(), &page_id).await?))
}

pub async fn add_social_link(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(page_id): Path<String>,
    Json(new): Json<NewSocialLink>,
) -> Result<Created<SocialLink>, ApiError> {
    Ok(created(state.service.add_social_link(user.id(), &page_id, &new).await?))
}

pub async fn delete_social_link(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_social_link(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Addresses

pub async fn list_addresses(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(page_id): Path<String>,
) -> Result<Json<Vec<Address>>, ApiError> {
    Ok(Json(state.service.list_addresses(user.id(), &page_id).await?))
}

/// The first address of a page becomes its default.
pub async fn add_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(page_id): Path<String>,
    Json(new): Json<NewAddress>,
) -> Result<Created<Address>, ApiError> {
    Ok(created(state.service.add_address(user.id(), &page_id, &new).await?))
}

pub async fn update_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<AddressUpdate>,
) -> Result<Json<Address>, ApiError> {
    Ok(Json(state.service.update_address(user.id(), &id, update).await?))
}

pub async fn set_default_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Address>, ApiError> {
    Ok(Json(state.service.set_default_address(user.id(), &id).await?))
}

pub async fn delete_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_address(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Interest options

pub async fn list_interests(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(page_id): Path<String>,
) -> Result<Json<Vec<InterestOption>>, ApiError> {
    Ok(Json(state.service.list_interests(user.id(), &page_id).await?))
}

pub async fn add_interest(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(page_id): Path<String>,
    Json(new): Json<NewInterest>,
) -> Result<Created<InterestOption>, ApiError> {
    let option = state
        .service
        .add_interest(user.id(), &page_id, &new.label)
        .await?;
    Ok(created(option))
}

pub async fn set_default_interest(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<InterestOption>, ApiError> {
    Ok(Json(state.service.set_default_interest(user.id(), &id).await?))
}

pub async fn delete_interest(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_interest(user.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
