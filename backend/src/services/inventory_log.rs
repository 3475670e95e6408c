//! Read-only audit query surface

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{InventoryLogEntry, InventoryLogFilter, PaginatedResponse, Pagination, Quantity};

use crate::error::{AppError, AppResult};
use crate::ledger::{Actor, SharedLedger};

#[derive(Clone)]
pub struct InventoryLogService {
    ledger: SharedLedger,
}

/// Flat CSV row; metadata is written as a JSON object
#[derive(Debug, Serialize)]
pub struct InventoryLogRow {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub company: String,
    pub site: String,
    pub item: String,
    pub product: String,
    pub delivery: String,
    pub action: String,
    pub parent_action: String,
    pub parent_action_id: String,
    pub old_quantity: Quantity,
    pub new_quantity: Quantity,
    pub delta: Quantity,
    pub metadata: String,
    pub fingerprint: String,
    pub version: String,
}

impl From<&InventoryLogEntry> for InventoryLogRow {
    fn from(entry: &InventoryLogEntry) -> Self {
        Self {
            sequence: entry.sequence,
            timestamp: entry.timestamp,
            actor: entry.actor.clone(),
            company: entry.company.clone(),
            site: entry.site.clone(),
            item: entry.item.clone(),
            product: entry.product.clone(),
            delivery: entry.delivery.clone().unwrap_or_default(),
            action: entry.action.to_string(),
            parent_action: entry.parent_action.clone(),
            parent_action_id: entry.parent_action_id.clone(),
            old_quantity: entry.old_quantity,
            new_quantity: entry.new_quantity,
            delta: entry.delta,
            metadata: serde_json::to_string(&entry.metadata).unwrap_or_default(),
            fingerprint: entry.fingerprint.clone(),
            version: entry.version.clone(),
        }
    }
}

impl InventoryLogService {
    pub fn new(ledger: SharedLedger) -> Self {
        Self { ledger }
    }

    /// Matching entries, oldest first; members only see their own company's
    pub async fn entries(
        &self,
        actor: &Actor,
        mut filter: InventoryLogFilter,
    ) -> AppResult<Vec<InventoryLogEntry>> {
        if !actor.is_admin() {
            filter.company = Some(actor.company.clone());
        }

        let ledger = self.ledger.read().await;
        Ok(ledger.audit().query(&filter).into_iter().cloned().collect())
    }

    /// One page of matching entries
    pub async fn query(
        &self,
        actor: &Actor,
        filter: InventoryLogFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<InventoryLogEntry>> {
        let entries = self.entries(actor, filter).await?;
        Ok(PaginatedResponse::paginate(entries, pagination))
    }

    /// Export entries as CSV
    pub fn export_to_csv(entries: &[InventoryLogEntry]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for entry in entries {
            wtr.serialize(InventoryLogRow::from(entry))
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}
