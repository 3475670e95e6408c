//! Postgres-backed ledger repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    Delivery, DeliveryKey, InventoryLogEntry, Item, ItemKey, LogAction, Metadata, Process,
    ProcessKey,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};

use super::LedgerRepository;
use crate::error::{AppError, AppResult};
use crate::ledger::{Change, Changeset, Ledger};

/// Ledger state stored in the `items`, `deliveries`, `processes` and
/// `inventory_log` tables
#[derive(Clone)]
pub struct PgLedgerRepository {
    db: PgPool,
}

impl PgLedgerRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Row of the `items` table
#[derive(Debug, FromRow)]
struct ItemRow {
    company_id: String,
    site_id: String,
    item_id: String,
    product: String,
    quantity: Decimal,
    metadata: Json<Metadata>,
    delivery_id: Option<String>,
    created_by: String,
    updated_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: String,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            company: row.company_id,
            site: row.site_id,
            item_id: row.item_id,
            product: row.product,
            quantity: row.quantity,
            metadata: row.metadata.0,
            delivery: row.delivery_id,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

/// Row of the `inventory_log` table
#[derive(Debug, FromRow)]
struct LogRow {
    sequence: i64,
    actor: String,
    company_id: String,
    item_id: String,
    site_id: String,
    product: String,
    delivery_id: Option<String>,
    metadata: Json<Metadata>,
    action: String,
    parent_action: String,
    parent_action_id: String,
    recorded_at: DateTime<Utc>,
    old_quantity: Decimal,
    new_quantity: Decimal,
    delta: Decimal,
    fingerprint: String,
    version: String,
}

impl TryFrom<LogRow> for InventoryLogEntry {
    type Error = AppError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        Ok(InventoryLogEntry {
            sequence: u64::try_from(row.sequence)
                .map_err(|_| AppError::Internal(format!("negative log sequence {}", row.sequence)))?,
            actor: row.actor,
            company: row.company_id,
            item: row.item_id,
            site: row.site_id,
            product: row.product,
            delivery: row.delivery_id,
            metadata: row.metadata.0,
            action: row.action.parse::<LogAction>().map_err(AppError::Internal)?,
            parent_action: row.parent_action,
            parent_action_id: row.parent_action_id,
            timestamp: row.recorded_at,
            old_quantity: row.old_quantity,
            new_quantity: row.new_quantity,
            delta: row.delta,
            fingerprint: row.fingerprint,
            version: row.version,
        })
    }
}

#[axum::async_trait]
impl LedgerRepository for PgLedgerRepository {
    async fn load(&self) -> AppResult<Ledger> {
        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT company_id, site_id, item_id, product, quantity, metadata, delivery_id,
                   created_by, updated_by, created_at, updated_at, version
            FROM items
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let deliveries = sqlx::query_scalar::<_, Json<Delivery>>("SELECT record FROM deliveries")
            .fetch_all(&self.db)
            .await?;

        let processes = sqlx::query_scalar::<_, Json<Process>>("SELECT record FROM processes")
            .fetch_all(&self.db)
            .await?;

        let entries = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT sequence, actor, company_id, item_id, site_id, product, delivery_id, metadata,
                   action, parent_action, parent_action_id, recorded_at, old_quantity,
                   new_quantity, delta, fingerprint, version
            FROM inventory_log
            ORDER BY sequence
            "#,
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(InventoryLogEntry::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        tracing::info!(
            items = items.len(),
            deliveries = deliveries.len(),
            processes = processes.len(),
            entries = entries.len(),
            "Ledger loaded from database"
        );

        Ok(Ledger::restore(
            items.into_iter().map(Item::from).collect(),
            deliveries.into_iter().map(|d| d.0).collect(),
            processes.into_iter().map(|p| p.0).collect(),
            entries,
        ))
    }

    async fn persist(&self, changes: &Changeset) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        for change in &changes.items {
            write_item(&mut tx, change).await?;
        }
        for entry in &changes.entries {
            append_entry(&mut tx, entry).await?;
        }
        for change in &changes.deliveries {
            write_delivery(&mut tx, change).await?;
        }
        for change in &changes.processes {
            write_process(&mut tx, change).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn write_item(conn: &mut PgConnection, change: &Change<ItemKey, Item>) -> AppResult<()> {
    let Some(item) = &change.after else {
        sqlx::query("DELETE FROM items WHERE company_id = $1 AND site_id = $2 AND item_id = $3")
            .bind(&change.key.company)
            .bind(&change.key.site)
            .bind(&change.key.item_id)
            .execute(&mut *conn)
            .await?;
        return Ok(());
    };

    sqlx::query(
        r#"
        INSERT INTO items (
            company_id, site_id, item_id, product, quantity, metadata, delivery_id,
            created_by, updated_by, created_at, updated_at, version
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (company_id, site_id, item_id) DO UPDATE
        SET product = EXCLUDED.product, quantity = EXCLUDED.quantity,
            metadata = EXCLUDED.metadata, delivery_id = EXCLUDED.delivery_id,
            updated_by = EXCLUDED.updated_by, updated_at = EXCLUDED.updated_at,
            version = EXCLUDED.version
        "#,
    )
    .bind(&item.company)
    .bind(&item.site)
    .bind(&item.item_id)
    .bind(&item.product)
    .bind(item.quantity)
    .bind(Json(&item.metadata))
    .bind(&item.delivery)
    .bind(&item.created_by)
    .bind(&item.updated_by)
    .bind(item.created_at)
    .bind(item.updated_at)
    .bind(&item.version)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn append_entry(conn: &mut PgConnection, entry: &InventoryLogEntry) -> AppResult<()> {
    let sequence = i64::try_from(entry.sequence)
        .map_err(|_| AppError::Internal(format!("log sequence {} out of range", entry.sequence)))?;

    sqlx::query(
        r#"
        INSERT INTO inventory_log (
            sequence, actor, company_id, item_id, site_id, product, delivery_id, metadata,
            action, parent_action, parent_action_id, recorded_at, old_quantity, new_quantity,
            delta, fingerprint, version
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(sequence)
    .bind(&entry.actor)
    .bind(&entry.company)
    .bind(&entry.item)
    .bind(&entry.site)
    .bind(&entry.product)
    .bind(&entry.delivery)
    .bind(Json(&entry.metadata))
    .bind(entry.action.as_str())
    .bind(&entry.parent_action)
    .bind(&entry.parent_action_id)
    .bind(entry.timestamp)
    .bind(entry.old_quantity)
    .bind(entry.new_quantity)
    .bind(entry.delta)
    .bind(&entry.fingerprint)
    .bind(&entry.version)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_delivery(
    conn: &mut PgConnection,
    change: &Change<DeliveryKey, Delivery>,
) -> AppResult<()> {
    let Some(delivery) = &change.after else {
        sqlx::query("DELETE FROM deliveries WHERE delivery_id = $1 AND route = $2")
            .bind(&change.key.delivery_id)
            .bind(&change.key.route)
            .execute(&mut *conn)
            .await?;
        return Ok(());
    };

    sqlx::query(
        r#"
        INSERT INTO deliveries (
            delivery_id, route, from_company, to_company, status, record, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (delivery_id, route) DO UPDATE
        SET to_company = EXCLUDED.to_company, status = EXCLUDED.status,
            record = EXCLUDED.record, updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&delivery.delivery_id)
    .bind(&delivery.route)
    .bind(&delivery.from_company)
    .bind(&delivery.to_company)
    .bind(delivery.status.as_str())
    .bind(Json(delivery))
    .bind(delivery.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_process(
    conn: &mut PgConnection,
    change: &Change<ProcessKey, Process>,
) -> AppResult<()> {
    let Some(process) = &change.after else {
        sqlx::query("DELETE FROM processes WHERE company_id = $1 AND process_id = $2")
            .bind(&change.key.company)
            .bind(&change.key.process_id)
            .execute(&mut *conn)
            .await?;
        return Ok(());
    };

    sqlx::query(
        r#"
        INSERT INTO processes (
            company_id, process_id, process_type, site_id, status, record, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (company_id, process_id) DO UPDATE
        SET status = EXCLUDED.status, record = EXCLUDED.record,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&process.company)
    .bind(&process.process_id)
    .bind(process.process_type.as_str())
    .bind(&process.site)
    .bind(process.status.as_str())
    .bind(Json(process))
    .bind(process.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_row(sequence: i64, action: &str) -> LogRow {
        LogRow {
            sequence,
            actor: "alice".into(),
            company_id: "acme".into(),
            item_id: "lot-1".into(),
            site_id: "WAREHOUSE".into(),
            product: "beans".into(),
            delivery_id: None,
            metadata: Json(Metadata::new()),
            action: action.into(),
            parent_action: "newdelivery".into(),
            parent_action_id: "D1".into(),
            recorded_at: Utc::now(),
            old_quantity: Decimal::from(10),
            new_quantity: Decimal::from(6),
            delta: Decimal::from(-4),
            fingerprint: String::new(),
            version: "1".into(),
        }
    }

    #[test]
    fn test_log_row_converts_to_entry() {
        let entry = InventoryLogEntry::try_from(log_row(7, "edititem")).unwrap();
        assert_eq!(entry.sequence, 7);
        assert_eq!(entry.action, LogAction::EditItem);
        assert_eq!(entry.site, "WAREHOUSE");
        assert!(entry.is_consistent());
    }

    #[test]
    fn test_corrupt_log_rows_are_rejected() {
        assert!(InventoryLogEntry::try_from(log_row(-1, "edititem")).is_err());
        assert!(InventoryLogEntry::try_from(log_row(3, "teleport")).is_err());
    }
}
