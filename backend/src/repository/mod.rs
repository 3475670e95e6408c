//! Durable storage for ledger state
//!
//! The engine commits in memory; the repository then writes the same
//! changeset in one storage transaction. When storage rejects it the
//! in-memory commit is reverted, so both sides move together.

mod postgres;

pub use postgres::PgLedgerRepository;

use crate::error::AppResult;
use crate::ledger::{Changeset, Ledger};

#[axum::async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Rebuild the ledger from storage
    async fn load(&self) -> AppResult<Ledger>;

    /// Write one operation's changes; all of them or none
    async fn persist(&self, changes: &Changeset) -> AppResult<()>;
}

/// Repository for deployments without a database; state lives only in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository;

#[axum::async_trait]
impl LedgerRepository for InMemoryRepository {
    async fn load(&self) -> AppResult<Ledger> {
        Ok(Ledger::new())
    }

    async fn persist(&self, _changes: &Changeset) -> AppResult<()> {
        Ok(())
    }
}

/// Persist what the last operation committed, reverting it in memory on failure
pub async fn save(ledger: &mut Ledger, repository: &dyn LedgerRepository) -> AppResult<()> {
    let changes = ledger.take_changes();
    if changes.is_empty() {
        return Ok(());
    }

    if let Err(err) = repository.persist(&changes).await {
        tracing::error!(
            error = %err,
            items = changes.items.len(),
            entries = changes.entries.len(),
            "Persisting ledger changes failed, reverting"
        );
        ledger.revert(changes);
        return Err(err);
    }
    Ok(())
}
