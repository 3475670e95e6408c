//! Create-or-adjust primitive for on-hand quantities

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    retain_item_metadata, InventoryLogEntry, Item, ItemKey, LogAction, Metadata, Quantity,
};

use super::context::OperationContext;
use super::error::{LedgerError, LedgerResult};
use super::store::LedgerTx;

/// One signed change to one item at one site
#[derive(Debug, Clone)]
pub struct DeltaRequest<'r> {
    pub key: ItemKey,
    /// Product to stamp on the item; empty keeps the current product
    pub product: &'r str,
    pub delta: Quantity,
    pub metadata: &'r Metadata,
    pub parent_action: &'r str,
    pub parent_action_id: &'r str,
    pub version: Option<&'r str>,
    /// When the change happened; stamped on the item and its audit entry
    pub timestamp: DateTime<Utc>,
}

impl LedgerTx<'_> {
    /// Adjust an existing item by `delta`, or create it when `delta` is positive.
    ///
    /// Writes exactly one audit entry. An item whose quantity reaches zero is
    /// removed. A zero delta is a no-op.
    pub fn apply_delta(
        &mut self,
        ctx: &OperationContext,
        req: DeltaRequest<'_>,
    ) -> LedgerResult<()> {
        if req.delta.is_zero() {
            return Ok(());
        }

        let (old_quantity, item, action) = match self.get(&req.key) {
            Some(existing) => {
                let new_quantity = existing.quantity.checked_add(req.delta).ok_or_else(|| {
                    LedgerError::QuantityOverflow {
                        key: req.key.clone(),
                        delta: req.delta,
                    }
                })?;
                if new_quantity < Decimal::ZERO {
                    return Err(LedgerError::InsufficientInventory {
                        key: req.key.clone(),
                        on_hand: existing.quantity,
                        delta: req.delta,
                    });
                }

                let mut item = existing.clone();
                item.quantity = new_quantity;
                if !req.product.is_empty() {
                    item.product = req.product.to_string();
                }
                item.metadata.extend(retain_item_metadata(req.metadata));
                item.updated_by = ctx.actor.user.clone();
                item.updated_at = req.timestamp;
                if let Some(version) = req.version {
                    item.version = version.to_string();
                }
                (existing.quantity, item, LogAction::EditItem)
            }
            None => {
                if req.delta <= Decimal::ZERO {
                    return Err(LedgerError::ItemNotFound {
                        key: req.key.clone(),
                        delta: req.delta,
                    });
                }
                if req.product.is_empty() {
                    return Err(LedgerError::validation(
                        req.key.item_id.clone(),
                        "product is required to create an item",
                    ));
                }

                let item = Item {
                    company: req.key.company.clone(),
                    site: req.key.site.clone(),
                    item_id: req.key.item_id.clone(),
                    product: req.product.to_string(),
                    quantity: req.delta,
                    metadata: retain_item_metadata(req.metadata),
                    delivery: None,
                    created_by: ctx.actor.user.clone(),
                    updated_by: ctx.actor.user.clone(),
                    created_at: req.timestamp,
                    updated_at: req.timestamp,
                    version: req
                        .version
                        .map(str::to_string)
                        .unwrap_or_else(|| ctx.schema_version.clone()),
                };
                (Decimal::ZERO, item, LogAction::NewItem)
            }
        };

        tracing::debug!(
            item = %req.key,
            delta = %req.delta,
            old_quantity = %old_quantity,
            new_quantity = %item.quantity,
            parent_action = req.parent_action,
            "Applying inventory delta"
        );

        let entry = audit_entry(
            ctx,
            &item,
            action,
            old_quantity,
            req.parent_action,
            req.parent_action_id,
            req.timestamp,
        );
        if item.quantity.is_zero() {
            self.remove(&req.key);
        } else {
            self.put(item);
        }
        self.record(entry);

        Ok(())
    }
}

/// Audit record for an item whose quantity moved from `old_quantity` to `item.quantity`
pub fn audit_entry(
    ctx: &OperationContext,
    item: &Item,
    action: LogAction,
    old_quantity: Quantity,
    parent_action: &str,
    parent_action_id: &str,
    timestamp: DateTime<Utc>,
) -> InventoryLogEntry {
    InventoryLogEntry {
        sequence: 0,
        actor: ctx.actor.user.clone(),
        company: item.company.clone(),
        item: item.item_id.clone(),
        site: item.site.clone(),
        product: item.product.clone(),
        delivery: item.delivery.clone(),
        metadata: item.metadata.clone(),
        action,
        parent_action: parent_action.to_string(),
        parent_action_id: parent_action_id.to_string(),
        timestamp,
        old_quantity,
        new_quantity: item.quantity,
        delta: item.quantity - old_quantity,
        fingerprint: ctx.fingerprint.clone(),
        version: ctx.schema_version.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::context::Actor;
    use crate::ledger::store::ItemStore;

    fn ctx() -> OperationContext {
        OperationContext::new(Actor::member("alice", "acme"), Utc::now())
    }

    fn request(delta: i64, metadata: &Metadata) -> DeltaRequest<'_> {
        DeltaRequest {
            key: ItemKey::new("acme", "S1", "widget-1"),
            product: "widget",
            delta: Decimal::from(delta),
            metadata,
            parent_action: "newdelivery",
            parent_action_id: "D1",
            version: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_positive_delta_creates_item() {
        let store = ItemStore::new();
        let metadata = Metadata::new();
        let mut tx = LedgerTx::new(&store);

        tx.apply_delta(&ctx(), request(5, &metadata)).unwrap();

        let item = tx.get(&ItemKey::new("acme", "S1", "widget-1")).unwrap();
        assert_eq!(item.quantity, Decimal::from(5));
        assert_eq!(tx.entries().len(), 1);
        assert_eq!(tx.entries()[0].action, LogAction::NewItem);
        assert_eq!(tx.entries()[0].old_quantity, Decimal::ZERO);
    }

    #[test]
    fn test_negative_delta_on_missing_item_fails() {
        let store = ItemStore::new();
        let metadata = Metadata::new();
        let mut tx = LedgerTx::new(&store);

        let err = tx.apply_delta(&ctx(), request(-1, &metadata)).unwrap_err();
        assert!(matches!(err, LedgerError::ItemNotFound { .. }));
        assert!(tx.entries().is_empty());
    }

    #[test]
    fn test_overdraw_fails_without_audit() {
        let store = ItemStore::new();
        let metadata = Metadata::new();
        let mut tx = LedgerTx::new(&store);
        tx.apply_delta(&ctx(), request(3, &metadata)).unwrap();

        let err = tx.apply_delta(&ctx(), request(-5, &metadata)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientInventory { .. }));
        assert_eq!(tx.entries().len(), 1);
    }

    #[test]
    fn test_reaching_zero_removes_item() {
        let store = ItemStore::new();
        let metadata = Metadata::new();
        let mut tx = LedgerTx::new(&store);
        tx.apply_delta(&ctx(), request(3, &metadata)).unwrap();
        tx.apply_delta(&ctx(), request(-3, &metadata)).unwrap();

        assert!(tx.get(&ItemKey::new("acme", "S1", "widget-1")).is_none());
        let last = tx.entries().last().unwrap();
        assert_eq!(last.new_quantity, Decimal::ZERO);
        assert!(last.is_consistent());
    }

    #[test]
    fn test_overflow_is_an_error_not_a_panic() {
        let store = ItemStore::new();
        let metadata = Metadata::new();
        let mut tx = LedgerTx::new(&store);
        let mut fill = request(1, &metadata);
        fill.delta = Decimal::MAX;
        tx.apply_delta(&ctx(), fill).unwrap();

        let err = tx.apply_delta(&ctx(), request(1, &metadata)).unwrap_err();
        assert!(matches!(err, LedgerError::QuantityOverflow { .. }));
        assert_eq!(err.field().as_deref(), Some("quantity"));
        assert_eq!(tx.entries().len(), 1);
        let key = ItemKey::new("acme", "S1", "widget-1");
        assert_eq!(tx.get(&key).unwrap().quantity, Decimal::MAX);
    }

    #[test]
    fn test_entry_uses_request_timestamp() {
        let store = ItemStore::new();
        let metadata = Metadata::new();
        let mut tx = LedgerTx::new(&store);
        let mut req = request(2, &metadata);
        let at = chrono::DateTime::parse_from_rfc3339("2024-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        req.timestamp = at;

        tx.apply_delta(&ctx(), req).unwrap();

        assert_eq!(tx.entries()[0].timestamp, at);
        let item = tx.get(&ItemKey::new("acme", "S1", "widget-1")).unwrap();
        assert_eq!(item.created_at, at);
    }

    #[test]
    fn test_metadata_is_filtered() {
        let store = ItemStore::new();
        let mut metadata = Metadata::new();
        metadata.insert("parent".into(), "lot-7".into());
        metadata.insert("colour".into(), "blue".into());
        let mut tx = LedgerTx::new(&store);

        tx.apply_delta(&ctx(), request(1, &metadata)).unwrap();

        let item = tx.get(&ItemKey::new("acme", "S1", "widget-1")).unwrap();
        assert_eq!(item.metadata.len(), 1);
        assert_eq!(item.metadata["parent"], "lot-7");
    }
}
