//! HTTP handler for the inventory log query surface

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shared::{InventoryLogFilter, Pagination};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::InventoryLogService;
use crate::AppState;

/// Query string of `GET /inventory-log`
#[derive(Debug, Default, Deserialize)]
pub struct InventoryLogQuery {
    pub item: Option<String>,
    pub site: Option<String>,
    pub product: Option<String>,
    pub company: Option<String>,
    pub actor: Option<String>,
    pub parent_action_id: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// `csv` for a file export; JSON otherwise
    pub format: Option<String>,
}

impl InventoryLogQuery {
    fn filter(&self) -> InventoryLogFilter {
        InventoryLogFilter {
            item: self.item.clone(),
            site: self.site.clone(),
            product: self.product.clone(),
            company: self.company.clone(),
            actor: self.actor.clone(),
            parent_action_id: self.parent_action_id.clone(),
        }
    }

    fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page).max(1),
            per_page: self.per_page.unwrap_or(defaults.per_page).max(1),
        }
    }
}

/// Query the inventory log as a JSON page or a CSV export
pub async fn query_inventory_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<InventoryLogQuery>,
) -> AppResult<Response> {
    check_permission(&current_user.0, "inventorylog", "read")?;
    let service = InventoryLogService::new(state.ledger.clone());
    let actor = current_user.0.actor();

    if query.format.as_deref() == Some("csv") {
        let entries = service.entries(&actor, query.filter()).await?;
        let csv_data = InventoryLogService::export_to_csv(&entries)?;
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"inventory_log.csv\"",
                ),
            ],
            csv_data,
        )
            .into_response());
    }

    let page = service
        .query(&actor, query.filter(), &query.pagination())
        .await?;
    Ok(Json(page).into_response())
}
