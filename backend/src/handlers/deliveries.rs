//! HTTP handlers for delivery endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{
    CreateDeliveryInput, Delivery, DeliveryFilter, DeliveryKey, EditDeliveryInput,
    RemoveDeliveryInput,
};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::DeliveryService;
use crate::AppState;

/// Route variant of a delivery; absent means the default route
#[derive(Debug, Default, Deserialize)]
pub struct RouteQuery {
    #[serde(default)]
    pub route: String,
}

fn delivery_key(delivery_id: String, query: RouteQuery) -> DeliveryKey {
    DeliveryKey::new(delivery_id, query.route)
}

/// Create a delivery
pub async fn create_delivery(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateDeliveryInput>,
) -> AppResult<(StatusCode, Json<Delivery>)> {
    check_permission(&current_user.0, "delivery", "create")?;
    let ctx = state.context(&current_user.0, input.request_id, input.timestamp, &input);
    let service = DeliveryService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let delivery = service.create(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

/// List deliveries
pub async fn list_deliveries(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<DeliveryFilter>,
) -> AppResult<Json<Vec<Delivery>>> {
    check_permission(&current_user.0, "delivery", "read")?;
    let service = DeliveryService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let deliveries = service.list(&current_user.0.actor(), filter).await?;
    Ok(Json(deliveries))
}

/// Get a delivery
pub async fn get_delivery(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(delivery_id): Path<String>,
    Query(query): Query<RouteQuery>,
) -> AppResult<Json<Delivery>> {
    check_permission(&current_user.0, "delivery", "read")?;
    let key = delivery_key(delivery_id, query);
    let service = DeliveryService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let delivery = service.get(&current_user.0.actor(), &key).await?;
    Ok(Json(delivery))
}

/// Edit a delivery
pub async fn edit_delivery(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(delivery_id): Path<String>,
    Query(query): Query<RouteQuery>,
    Json(patch): Json<EditDeliveryInput>,
) -> AppResult<Json<Delivery>> {
    check_permission(&current_user.0, "delivery", "edit")?;
    let key = delivery_key(delivery_id, query);
    let ctx = state.context(&current_user.0, patch.request_id, patch.timestamp, &(&key, &patch));
    let service = DeliveryService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let delivery = service.edit(&ctx, &key, patch).await?;
    Ok(Json(delivery))
}

/// Cancel a delivery
pub async fn cancel_delivery(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(delivery_id): Path<String>,
    Query(query): Query<RouteQuery>,
    body: Option<Json<RemoveDeliveryInput>>,
) -> AppResult<Json<Delivery>> {
    check_permission(&current_user.0, "delivery", "cancel")?;
    let key = delivery_key(delivery_id, query);
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let ctx = state.context(&current_user.0, input.request_id, input.timestamp, &(&key, &input));
    let service = DeliveryService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let delivery = service.cancel(&ctx, &key).await?;
    Ok(Json(delivery))
}

/// Delete a delivery record (admin)
pub async fn delete_delivery(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(delivery_id): Path<String>,
    Query(query): Query<RouteQuery>,
    body: Option<Json<RemoveDeliveryInput>>,
) -> AppResult<Json<Delivery>> {
    check_permission(&current_user.0, "delivery", "delete")?;
    let key = delivery_key(delivery_id, query);
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let ctx = state.context(&current_user.0, input.request_id, input.timestamp, &(&key, &input));
    let service = DeliveryService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let delivery = service.delete(&ctx, &key).await?;
    Ok(Json(delivery))
}
