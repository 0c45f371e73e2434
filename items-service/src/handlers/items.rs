//! Item CRUD for the authenticated caller.
//!
//! Reads and writes run with the caller's token. Ownership is also checked
//! here so a permissive row-level policy cannot expose another user's item.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{
    middleware::{AuthUser, RequestIdentity},
    models::{CreateItemRequest, Item, ItemResponse, UpdateItemRequest},
    supabase::DataError,
    utils::ValidatedJson,
    AppState,
};

fn item_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Item not found"))
}

/// Loads an item and checks that the caller owns it.
async fn load_owned(
    state: &AppState,
    identity: &RequestIdentity,
    id: &str,
) -> Result<Item, AppError> {
    let item = state
        .repository
        .get_by_id(id, &identity.access_token)
        .await
        .map_err(|e| match e {
            DataError::NotFound => item_not_found(),
            other => other.into(),
        })?;

    if !item.is_owned_by(identity.user_id()) {
        tracing::warn!(
            item_id = %id,
            user_id = %identity.user_id(),
            "Denied access to another user's item"
        );
        return Err(AppError::Forbidden(anyhow::anyhow!("Access denied")));
    }

    Ok(item)
}

/// GET /api/v1/items
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let items = state
        .repository
        .list_by_user(identity.user_id(), &identity.access_token)
        .await?;

    tracing::debug!(user_id = %identity.user_id(), count = items.len(), "Listed items");

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// GET /api/v1/items/:id
pub async fn get_item(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, AppError> {
    let item = load_owned(&state, &identity, &id).await?;
    Ok(Json(ItemResponse::from(item)))
}

/// POST /api/v1/items
pub async fn create_item(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), AppError> {
    tracing::info!(user_id = %identity.user_id(), "Creating item");

    let item = state
        .repository
        .create(identity.user_id(), payload, &identity.access_token)
        .await?
        .ok_or_else(|| {
            AppError::UpstreamError(anyhow::anyhow!("Insert returned no representation"))
        })?;

    Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
}

/// PATCH /api/v1/items/:id
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    load_owned(&state, &identity, &id).await?;

    tracing::info!(item_id = %id, user_id = %identity.user_id(), "Updating item");

    let item = state
        .repository
        .update(&id, payload, &identity.access_token)
        .await?
        .ok_or_else(item_not_found)?;

    Ok(Json(ItemResponse::from(item)))
}

/// DELETE /api/v1/items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    load_owned(&state, &identity, &id).await?;

    tracing::info!(item_id = %id, user_id = %identity.user_id(), "Deleting item");

    state
        .repository
        .delete(&id, &identity.access_token)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
