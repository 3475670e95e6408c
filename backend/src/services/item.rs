//! Item service: direct create/edit/delete of on-hand records

use std::sync::Arc;

use shared::{CreateItemInput, DeleteItemInput, EditItemInput, Item, ItemFilter, ItemKey, SiteRef};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::{resolve_scope, SiteDirectory};
use crate::repository::{save, LedgerRepository};
use crate::ledger::{Actor, OperationContext, SharedLedger};

#[derive(Clone)]
pub struct ItemService {
    ledger: SharedLedger,
    sites: Arc<dyn SiteDirectory>,
    repository: Arc<dyn LedgerRepository>,
}

impl ItemService {
    pub fn new(
        ledger: SharedLedger,
        sites: Arc<dyn SiteDirectory>,
        repository: Arc<dyn LedgerRepository>,
    ) -> Self {
        Self {
            ledger,
            sites,
            repository,
        }
    }

    pub async fn create(&self, ctx: &OperationContext, input: CreateItemInput) -> AppResult<Item> {
        input.validate()?;

        let company = input.company.as_ref().unwrap_or(&ctx.actor.company);
        let site = SiteRef::new(company, &input.site);

        let mut ledger = self.ledger.write().await;
        let scope = resolve_scope(self.sites.as_ref(), [site]).await?;

        let item = ledger.create_item(ctx, &scope, input)?;
        save(&mut ledger, self.repository.as_ref()).await?;
        Ok(item)
    }

    /// Edit an item; `None` means the item was removed at zero quantity
    pub async fn edit(
        &self,
        ctx: &OperationContext,
        key: &ItemKey,
        patch: EditItemInput,
    ) -> AppResult<Option<Item>> {
        patch.validate()?;

        let mut ledger = self.ledger.write().await;
        let item = ledger.edit_item(ctx, key, patch)?;
        save(&mut ledger, self.repository.as_ref()).await?;
        Ok(item)
    }

    pub async fn delete(
        &self,
        ctx: &OperationContext,
        key: &ItemKey,
        input: DeleteItemInput,
    ) -> AppResult<Item> {
        let mut ledger = self.ledger.write().await;
        let item = ledger.delete_item(ctx, key, input)?;
        save(&mut ledger, self.repository.as_ref()).await?;
        Ok(item)
    }

    pub async fn get(&self, actor: &Actor, key: &ItemKey) -> AppResult<Item> {
        let ledger = self.ledger.read().await;
        ledger
            .get_item(key)
            .filter(|item| actor.acts_for(&item.company))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Item {}", key)))
    }

    /// List items; members only see their own company's
    pub async fn list(&self, actor: &Actor, mut filter: ItemFilter) -> AppResult<Vec<Item>> {
        if !actor.is_admin() {
            filter.company = Some(actor.company.clone());
        }

        let ledger = self.ledger.read().await;
        Ok(ledger.list_items(&filter).into_iter().cloned().collect())
    }
}
