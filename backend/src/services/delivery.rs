//! Delivery service: resolves sites and drives the delivery state machine

use std::sync::Arc;

use shared::{
    CreateDeliveryInput, Delivery, DeliveryFilter, DeliveryKey, EditDeliveryInput, SiteRef,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::{resolve_scope, SiteDirectory};
use crate::repository::{save, LedgerRepository};
use crate::ledger::{Actor, OperationContext, SharedLedger};

#[derive(Clone)]
pub struct DeliveryService {
    ledger: SharedLedger,
    sites: Arc<dyn SiteDirectory>,
    repository: Arc<dyn LedgerRepository>,
}

impl DeliveryService {
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

    /// Create a delivery, charging the source site
    pub async fn create(
        &self,
        ctx: &OperationContext,
        input: CreateDeliveryInput,
    ) -> AppResult<Delivery> {
        input.validate()?;

        let mut ledger = self.ledger.write().await;
        let scope = resolve_scope(
            self.sites.as_ref(),
            [
                SiteRef::new(&input.from_company, &input.from_site),
                SiteRef::new(&input.to_company, &input.to_site),
            ],
        )
        .await?;

        let delivery = ledger.create_delivery(ctx, &scope, input)?;
        save(&mut ledger, self.repository.as_ref()).await?;
        Ok(delivery)
    }

    /// Edit a delivery's details, cargo or status
    pub async fn edit(
        &self,
        ctx: &OperationContext,
        key: &DeliveryKey,
        patch: EditDeliveryInput,
    ) -> AppResult<Delivery> {
        patch.validate()?;

        let mut ledger = self.ledger.write().await;
        let sites = match ledger.get_delivery(key) {
            Some(delivery) => vec![
                delivery.from_site_ref(),
                delivery.to_site_ref(),
                SiteRef::new(
                    patch.to_company.as_ref().unwrap_or(&delivery.to_company),
                    patch.to_site.as_ref().unwrap_or(&delivery.to_site),
                ),
            ],
            None => Vec::new(),
        };
        let scope = resolve_scope(self.sites.as_ref(), sites).await?;

        let delivery = ledger.edit_delivery(ctx, &scope, key, patch)?;
        save(&mut ledger, self.repository.as_ref()).await?;
        Ok(delivery)
    }

    /// Cancel a delivery, refunding the source site
    pub async fn cancel(&self, ctx: &OperationContext, key: &DeliveryKey) -> AppResult<Delivery> {
        let mut ledger = self.ledger.write().await;
        let sites = ledger
            .get_delivery(key)
            .map(|delivery| vec![delivery.from_site_ref()])
            .unwrap_or_default();
        let scope = resolve_scope(self.sites.as_ref(), sites).await?;

        let delivery = ledger.cancel_delivery(ctx, &scope, key)?;
        save(&mut ledger, self.repository.as_ref()).await?;
        Ok(delivery)
    }

    /// Remove a delivery record without refund
    pub async fn delete(&self, ctx: &OperationContext, key: &DeliveryKey) -> AppResult<Delivery> {
        let mut ledger = self.ledger.write().await;
        let delivery = ledger.delete_delivery(ctx, key)?;
        save(&mut ledger, self.repository.as_ref()).await?;
        Ok(delivery)
    }

    /// Get a delivery the actor's company is part of
    pub async fn get(&self, actor: &Actor, key: &DeliveryKey) -> AppResult<Delivery> {
        let ledger = self.ledger.read().await;
        ledger
            .get_delivery(key)
            .filter(|d| actor.acts_for(&d.from_company) || actor.acts_for(&d.to_company))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Delivery {}", key)))
    }

    /// List deliveries; members only see their own company's
    pub async fn list(&self, actor: &Actor, mut filter: DeliveryFilter) -> AppResult<Vec<Delivery>> {
        if !actor.is_admin() {
            filter.company = Some(actor.company.clone());
        }

        let ledger = self.ledger.read().await;
        Ok(ledger
            .list_deliveries(&filter)
            .into_iter()
            .cloned()
            .collect())
    }
}
