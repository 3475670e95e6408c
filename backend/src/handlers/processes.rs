//! HTTP handlers for process endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{
    CreateProcessInput, EditProcessInput, Process, ProcessFilter, ProcessKey, RemoveProcessInput,
};

use crate::error::AppResult;
use crate::handlers::items::CompanyQuery;
use crate::middleware::{check_permission, AuthUser, CurrentUser};
use crate::services::ProcessService;
use crate::AppState;

fn process_key(user: &AuthUser, query: CompanyQuery, process_id: String) -> ProcessKey {
    let company = query.company.unwrap_or_else(|| user.company.clone());
    ProcessKey::new(company, process_id)
}

/// Create a process
pub async fn create_process(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProcessInput>,
) -> AppResult<(StatusCode, Json<Process>)> {
    check_permission(&current_user.0, "process", "create")?;
    let ctx = state.context(&current_user.0, input.request_id, input.timestamp, &input);
    let service = ProcessService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let process = service.create(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(process)))
}

/// List processes
pub async fn list_processes(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<ProcessFilter>,
) -> AppResult<Json<Vec<Process>>> {
    check_permission(&current_user.0, "process", "read")?;
    let service = ProcessService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let processes = service.list(&current_user.0.actor(), filter).await?;
    Ok(Json(processes))
}

/// Get a process
pub async fn get_process(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(process_id): Path<String>,
    Query(query): Query<CompanyQuery>,
) -> AppResult<Json<Process>> {
    check_permission(&current_user.0, "process", "read")?;
    let key = process_key(&current_user.0, query, process_id);
    let service = ProcessService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let process = service.get(&current_user.0.actor(), &key).await?;
    Ok(Json(process))
}

/// Edit a process
pub async fn edit_process(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(process_id): Path<String>,
    Query(query): Query<CompanyQuery>,
    Json(patch): Json<EditProcessInput>,
) -> AppResult<Json<Process>> {
    check_permission(&current_user.0, "process", "edit")?;
    let key = process_key(&current_user.0, query, process_id);
    let ctx = state.context(&current_user.0, patch.request_id, patch.timestamp, &(&key, &patch));
    let service = ProcessService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let process = service.edit(&ctx, &key, patch).await?;
    Ok(Json(process))
}

/// Cancel a process
pub async fn cancel_process(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(process_id): Path<String>,
    Query(query): Query<CompanyQuery>,
    body: Option<Json<RemoveProcessInput>>,
) -> AppResult<Json<Process>> {
    check_permission(&current_user.0, "process", "cancel")?;
    let key = process_key(&current_user.0, query, process_id);
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let ctx = state.context(&current_user.0, input.request_id, input.timestamp, &(&key, &input));
    let service = ProcessService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let process = service.cancel(&ctx, &key).await?;
    Ok(Json(process))
}

/// Delete a process record (admin)
pub async fn delete_process(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(process_id): Path<String>,
    Query(query): Query<CompanyQuery>,
    body: Option<Json<RemoveProcessInput>>,
) -> AppResult<Json<Process>> {
    check_permission(&current_user.0, "process", "delete")?;
    let key = process_key(&current_user.0, query, process_id);
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let ctx = state.context(&current_user.0, input.request_id, input.timestamp, &(&key, &input));
    let service = ProcessService::new(
        state.ledger.clone(),
        state.sites.clone(),
        state.repository.clone(),
    );
    let process = service.delete(&ctx, &key).await?;
    Ok(Json(process))
}
