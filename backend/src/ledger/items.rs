//! Direct item operations

use rust_decimal::Decimal;
use shared::{
    retain_item_metadata, validate_identifier, CargoMap, CreateItemInput, DeleteItemInput,
    EditItemInput, Item, ItemFilter, ItemKey, LedgerAction, LogAction, SiteRef,
};

use super::context::OperationContext;
use super::error::{LedgerError, LedgerResult};
use super::scope::SiteScope;
use super::store::LedgerTx;
use super::upsert::{audit_entry, DeltaRequest};
use super::Ledger;

const ENTITY: &str = "item";

/// Reject malformed item ids, negative lines and, when required, lines without a product
pub(crate) fn check_cargo_lines(
    field: &str,
    cargo: &CargoMap,
    require_product: bool,
) -> LedgerResult<()> {
    for (item, line) in cargo {
        validate_identifier(item)
            .map_err(|msg| LedgerError::validation(format!("{}.{}", field, item), msg))?;
        if line.quantity < Decimal::ZERO {
            return Err(LedgerError::NegativeQuantity {
                item: item.clone(),
                quantity: line.quantity,
            });
        }
        if require_product && line.product.is_empty() {
            return Err(LedgerError::validation(
                format!("{}.{}", field, item),
                "product is missing",
            ));
        }
    }
    Ok(())
}

impl Ledger {
    pub fn list_items(&self, filter: &ItemFilter) -> Vec<&Item> {
        self.items.list(filter)
    }

    /// Create an item with a positive quantity at a tracked site
    pub fn create_item(
        &mut self,
        ctx: &OperationContext,
        scope: &SiteScope,
        input: CreateItemInput,
    ) -> LedgerResult<Item> {
        let company = input
            .company
            .clone()
            .unwrap_or_else(|| ctx.actor.company.clone());
        for (field, value) in [
            ("company", &company),
            ("site", &input.site),
            ("item_id", &input.item_id),
        ] {
            validate_identifier(value).map_err(|msg| LedgerError::validation(field, msg))?;
        }
        if input.product.is_empty() {
            return Err(LedgerError::validation("product", "product is missing"));
        }
        if input.quantity <= Decimal::ZERO {
            return Err(LedgerError::validation(
                "quantity",
                "quantity must be greater than zero",
            ));
        }

        let key = ItemKey::new(company.clone(), input.site.clone(), input.item_id.clone());
        if !ctx.actor.acts_for(&company) {
            return Err(LedgerError::CompanyMismatch {
                entity: ENTITY,
                id: key.to_string(),
                company: ctx.actor.company.clone(),
            });
        }

        let site = SiteRef::new(company, input.site.clone());
        if !scope.require(&site)?.tracked {
            return Err(LedgerError::validation(
                "site",
                format!("site {} is not inventory-tracked", site),
            ));
        }
        if self.items.get(&key).is_some() {
            return Err(LedgerError::already_exists(ENTITY, &key));
        }

        let parent_action = input
            .parent_action
            .clone()
            .unwrap_or_else(|| LedgerAction::NewItem.to_string());
        let parent_action_id = input
            .parent_action_id
            .clone()
            .unwrap_or_else(|| key.to_string());

        let mut tx = LedgerTx::new(&self.items);
        tx.apply_delta(
            ctx,
            DeltaRequest {
                key: key.clone(),
                product: &input.product,
                delta: input.quantity,
                metadata: &input.metadata,
                parent_action: &parent_action,
                parent_action_id: &parent_action_id,
                version: input.version.as_deref(),
                timestamp: ctx.timestamp,
            },
        )?;
        let created = tx
            .get(&key)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(ENTITY, &key))?;

        self.commit(tx.into_changes());
        tracing::info!(item = %key, quantity = %created.quantity, "Item created");
        Ok(created)
    }

    /// Apply a patch to an item. Returns `None` when the item was removed
    /// because its quantity reached zero.
    pub fn edit_item(
        &mut self,
        ctx: &OperationContext,
        key: &ItemKey,
        patch: EditItemInput,
    ) -> LedgerResult<Option<Item>> {
        if patch.is_empty() {
            return Err(LedgerError::validation("patch", "nothing to change"));
        }
        if patch.quantity.is_some() && patch.delta.is_some() {
            return Err(LedgerError::validation(
                "quantity",
                "give either quantity or delta, not both",
            ));
        }
        if let Some(quantity) = patch.quantity {
            if quantity < Decimal::ZERO {
                return Err(LedgerError::NegativeQuantity {
                    item: key.item_id.clone(),
                    quantity,
                });
            }
        }
        if let Some(product) = &patch.product {
            if product.is_empty() {
                return Err(LedgerError::validation("product", "product cannot be empty"));
            }
        }

        let existing = self
            .items
            .get(key)
            .ok_or_else(|| LedgerError::not_found(ENTITY, key))?;
        if !ctx.actor.acts_for(&existing.company) {
            return Err(LedgerError::CompanyMismatch {
                entity: ENTITY,
                id: key.to_string(),
                company: ctx.actor.company.clone(),
            });
        }

        let delta = match (patch.quantity, patch.delta) {
            (Some(quantity), _) => quantity.checked_sub(existing.quantity).ok_or_else(|| {
                LedgerError::QuantityOverflow {
                    key: key.clone(),
                    delta: quantity,
                }
            })?,
            (None, Some(delta)) => delta,
            (None, None) => Decimal::ZERO,
        };

        let mut item = existing.clone();
        if let Some(product) = &patch.product {
            item.product = product.clone();
        }
        if let Some(metadata) = &patch.metadata {
            item.metadata.extend(retain_item_metadata(metadata));
        }
        if let Some(delivery) = patch.delivery {
            item.delivery = if delivery.is_empty() { None } else { Some(delivery) };
        }
        if let Some(version) = &patch.version {
            item.version = version.clone();
        }
        item.updated_by = ctx.actor.user.clone();
        item.updated_at = ctx.timestamp;

        let parent_action = patch
            .parent_action
            .unwrap_or_else(|| LedgerAction::EditItem.to_string());
        let parent_action_id = patch.parent_action_id.unwrap_or_else(|| key.to_string());

        let mut tx = LedgerTx::new(&self.items);
        tx.put(item);
        tx.apply_delta(
            ctx,
            DeltaRequest {
                key: key.clone(),
                product: "",
                delta,
                metadata: &Default::default(),
                parent_action: &parent_action,
                parent_action_id: &parent_action_id,
                version: None,
                timestamp: ctx.timestamp,
            },
        )?;
        let edited = tx.get(key).cloned();

        self.commit(tx.into_changes());
        tracing::info!(item = %key, delta = %delta, removed = edited.is_none(), "Item edited");
        Ok(edited)
    }

    /// Remove an item, recording its quantity going to zero
    pub fn delete_item(
        &mut self,
        ctx: &OperationContext,
        key: &ItemKey,
        input: DeleteItemInput,
    ) -> LedgerResult<Item> {
        let existing = self
            .items
            .get(key)
            .ok_or_else(|| LedgerError::not_found(ENTITY, key))?;
        if !ctx.actor.acts_for(&existing.company) {
            return Err(LedgerError::CompanyMismatch {
                entity: ENTITY,
                id: key.to_string(),
                company: ctx.actor.company.clone(),
            });
        }

        let removed = existing.clone();
        let mut zeroed = removed.clone();
        zeroed.quantity = Decimal::ZERO;
        let parent_action = input
            .parent_action
            .unwrap_or_else(|| LedgerAction::DelItem.to_string());
        let parent_action_id = input.parent_action_id.unwrap_or_else(|| key.to_string());

        let mut tx = LedgerTx::new(&self.items);
        tx.record(audit_entry(
            ctx,
            &zeroed,
            LogAction::DelItem,
            removed.quantity,
            &parent_action,
            &parent_action_id,
            ctx.timestamp,
        ));
        tx.remove(key);

        self.commit(tx.into_changes());
        tracing::info!(item = %key, quantity = %removed.quantity, "Item deleted");
        Ok(removed)
    }
}
