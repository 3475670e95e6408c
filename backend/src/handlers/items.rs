//! HTTP handlers for direct item operations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{CreateItemInput, DeleteItemInput, EditItemInput, Item, ItemFilter, ItemKey};

use crate::error::AppResult;
use crate::middleware::{check_permission, AuthUser, CurrentUser};
use crate::services::ItemService;
use crate::AppState;

/// Owning company of an item path; admins may address other companies
#[derive(Debug, Default, Deserialize)]
pub struct CompanyQuery {
    pub company: Option<String>,
}

fn item_key(user: &AuthUser, query: CompanyQuery, site: String, item_id: String) -> ItemKey {
    let company = query.company.unwrap_or_else(|| user.company.clone());
    ItemKey::new(company, site, item_id)
}

/// Create an item
pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateItemInput>,
) -> AppResult<(StatusCode, Json<Item>)> {
    check_permission(&current_user.0, "item", "create")?;
    let ctx = state.context(&current_user.0, input.request_id, input.timestamp, &input);
    let service = ItemService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let item = service.create(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// List items
pub async fn list_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<ItemFilter>,
) -> AppResult<Json<Vec<Item>>> {
    check_permission(&current_user.0, "item", "read")?;
    let service = ItemService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let items = service.list(&current_user.0.actor(), filter).await?;
    Ok(Json(items))
}

/// Get an item
pub async fn get_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((site, item_id)): Path<(String, String)>,
    Query(query): Query<CompanyQuery>,
) -> AppResult<Json<Item>> {
    check_permission(&current_user.0, "item", "read")?;
    let key = item_key(&current_user.0, query, site, item_id);
    let service = ItemService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let item = service.get(&current_user.0.actor(), &key).await?;
    Ok(Json(item))
}

/// Edit an item; responds with `null` when the item reached zero and was removed
pub async fn edit_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((site, item_id)): Path<(String, String)>,
    Query(query): Query<CompanyQuery>,
    Json(patch): Json<EditItemInput>,
) -> AppResult<Json<Option<Item>>> {
    check_permission(&current_user.0, "item", "edit")?;
    let key = item_key(&current_user.0, query, site, item_id);
    let ctx = state.context(&current_user.0, patch.request_id, patch.timestamp, &(&key, &patch));
    let service = ItemService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let item = service.edit(&ctx, &key, patch).await?;
    Ok(Json(item))
}

/// Delete an item
pub async fn delete_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((site, item_id)): Path<(String, String)>,
    Query(query): Query<CompanyQuery>,
    body: Option<Json<DeleteItemInput>>,
) -> AppResult<Json<Item>> {
    check_permission(&current_user.0, "item", "delete")?;
    let key = item_key(&current_user.0, query, site, item_id);
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let ctx = state.context(&current_user.0, input.request_id, input.timestamp, &(&key, &input));
    let service = ItemService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let item = service.delete(&ctx, &key, input).await?;
    Ok(Json(item))
}
