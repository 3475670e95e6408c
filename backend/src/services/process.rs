//! Process service: resolves the process site and drives the process state machine

use std::sync::Arc;

use shared::{CreateProcessInput, EditProcessInput, Process, ProcessFilter, ProcessKey, SiteRef};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::{resolve_scope, SiteDirectory};
use crate::repository::{save, LedgerRepository};
use crate::ledger::{Actor, Ledger, LedgerResult, OperationContext, SharedLedger, SiteScope};

#[derive(Clone)]
pub struct ProcessService {
    ledger: SharedLedger,
    sites: Arc<dyn SiteDirectory>,
    repository: Arc<dyn LedgerRepository>,
}

impl ProcessService {
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

    /// Create a process, charging inputs (and crediting outputs for atomic types)
    pub async fn create(
        &self,
        ctx: &OperationContext,
        input: CreateProcessInput,
    ) -> AppResult<Process> {
        input.validate()?;

        let company = input.company.as_ref().unwrap_or(&ctx.actor.company);
        let site = SiteRef::new(company, &input.site);

        let mut ledger = self.ledger.write().await;
        let scope = resolve_scope(self.sites.as_ref(), [site]).await?;

        let process = ledger.create_process(ctx, &scope, input)?;
        save(&mut ledger, self.repository.as_ref()).await?;
        Ok(process)
    }

    /// Edit a running process
    pub async fn edit(
        &self,
        ctx: &OperationContext,
        key: &ProcessKey,
        patch: EditProcessInput,
    ) -> AppResult<Process> {
        patch.validate()?;
        self.with_site_scope(key, |ledger, scope| {
            ledger.edit_process(ctx, scope, key, patch)
        })
        .await
    }

    /// Cancel a running process, refunding its inputs
    pub async fn cancel(&self, ctx: &OperationContext, key: &ProcessKey) -> AppResult<Process> {
        self.with_site_scope(key, |ledger, scope| ledger.cancel_process(ctx, scope, key))
            .await
    }

    /// Remove a process record without refund
    pub async fn delete(&self, ctx: &OperationContext, key: &ProcessKey) -> AppResult<Process> {
        let mut ledger = self.ledger.write().await;
        let process = ledger.delete_process(ctx, key)?;
        save(&mut ledger, self.repository.as_ref()).await?;
        Ok(process)
    }

    pub async fn get(&self, actor: &Actor, key: &ProcessKey) -> AppResult<Process> {
        let ledger = self.ledger.read().await;
        ledger
            .get_process(key)
            .filter(|p| actor.acts_for(&p.company))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Process {}", key)))
    }

    /// List processes; members only see their own company's
    pub async fn list(&self, actor: &Actor, mut filter: ProcessFilter) -> AppResult<Vec<Process>> {
        if !actor.is_admin() {
            filter.company = Some(actor.company.clone());
        }

        let ledger = self.ledger.read().await;
        Ok(ledger
            .list_processes(&filter)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Run an engine operation under the write lock with the process site resolved
    async fn with_site_scope<F>(&self, key: &ProcessKey, op: F) -> AppResult<Process>
    where
        F: FnOnce(&mut Ledger, &SiteScope) -> LedgerResult<Process>,
    {
        let mut ledger = self.ledger.write().await;
        let sites = ledger
            .get_process(key)
            .map(|process| vec![process.site_ref()])
            .unwrap_or_default();
        let scope = resolve_scope(self.sites.as_ref(), sites).await?;

        let process = op(&mut *ledger, &scope)?;
        save(&mut ledger, self.repository.as_ref()).await?;
        Ok(process)
    }
}
