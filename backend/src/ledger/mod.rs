//! Inventory ledger engine
//!
//! The engine is synchronous. Each operation takes `&mut Ledger`, stages its
//! writes in a [`LedgerTx`] and commits them only when every step succeeded.
//! Callers serialize operations through [`SharedLedger`]'s write lock.
//!
//! Every commit is also recorded in a [`Changeset`] journal. Callers that
//! persist the ledger drain it with [`Ledger::take_changes`] after each
//! operation and hand it back to [`Ledger::revert`] if storage rejects it.

pub mod audit;
pub mod cargo;
pub mod context;
pub mod delivery;
pub mod error;
pub mod items;
pub mod journal;
pub mod process;
pub mod scope;
pub mod store;
pub mod upsert;

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use shared::{
    Delivery, DeliveryKey, InventoryLogEntry, Item, ItemKey, Process, ProcessKey, Quantity,
};
use tokio::sync::RwLock;

pub use audit::AuditLog;
pub use context::{Actor, OperationContext, Role};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use journal::{Change, Changeset};
pub use scope::{SiteScope, SiteStatus};
pub use store::{ItemStore, LedgerTx, TxChanges};

/// Ledger shared between request handlers; the write lock is the single writer
pub type SharedLedger = Arc<RwLock<Ledger>>;

/// Current state of items, deliveries and processes plus the audit log
#[derive(Debug, Default)]
pub struct Ledger {
    items: ItemStore,
    audit: AuditLog,
    deliveries: BTreeMap<DeliveryKey, Delivery>,
    processes: BTreeMap<ProcessKey, Process>,
    journal: Changeset,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted records; entries must be in sequence order
    pub fn restore(
        items: Vec<Item>,
        deliveries: Vec<Delivery>,
        processes: Vec<Process>,
        entries: Vec<InventoryLogEntry>,
    ) -> Self {
        let mut ledger = Self::new();
        for item in items {
            ledger.items.insert(item);
        }
        ledger.deliveries = deliveries.into_iter().map(|d| (d.key(), d)).collect();
        ledger.processes = processes.into_iter().map(|p| (p.key(), p)).collect();
        ledger.audit = AuditLog::from_entries(entries);
        ledger
    }

    pub fn shared(self) -> SharedLedger {
        Arc::new(RwLock::new(self))
    }

    pub fn items(&self) -> &ItemStore {
        &self.items
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// On-hand quantity, zero when the item does not exist
    pub fn quantity(&self, key: &ItemKey) -> Quantity {
        self.items
            .get(key)
            .map(|item| item.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn get_item(&self, key: &ItemKey) -> Option<&Item> {
        self.items.get(key)
    }

    pub fn get_delivery(&self, key: &DeliveryKey) -> Option<&Delivery> {
        self.deliveries.get(key)
    }

    pub fn get_process(&self, key: &ProcessKey) -> Option<&Process> {
        self.processes.get(key)
    }

    /// Drain the journal of changes committed since the last call
    pub fn take_changes(&mut self) -> Changeset {
        std::mem::take(&mut self.journal)
    }

    /// Undo a drained changeset, newest change first
    pub fn revert(&mut self, changes: Changeset) {
        for change in changes.processes.into_iter().rev() {
            match change.before {
                Some(process) => {
                    self.processes.insert(change.key, process);
                }
                None => {
                    self.processes.remove(&change.key);
                }
            }
        }
        for change in changes.deliveries.into_iter().rev() {
            match change.before {
                Some(delivery) => {
                    self.deliveries.insert(change.key, delivery);
                }
                None => {
                    self.deliveries.remove(&change.key);
                }
            }
        }
        if let Some(first) = changes.entries.first() {
            self.audit.truncate(first.sequence);
        }
        for change in changes.items.into_iter().rev() {
            match change.before {
                Some(item) => self.items.insert(item),
                None => {
                    self.items.remove(&change.key);
                }
            }
        }
    }

    /// Apply staged changes; returns the number of audit entries written
    fn commit(&mut self, changes: TxChanges) -> usize {
        for (key, item) in changes.items {
            let before = self.items.get(&key).cloned();
            match &item {
                Some(item) => self.items.insert(item.clone()),
                None => {
                    self.items.remove(&key);
                }
            }
            self.journal.items.push(Change {
                key,
                before,
                after: item,
            });
        }

        let written = changes.entries.len();
        for mut entry in changes.entries {
            entry.sequence = self.audit.append(entry.clone());
            self.journal.entries.push(entry);
        }
        written
    }

    fn put_delivery(&mut self, delivery: Delivery) {
        let key = delivery.key();
        let before = self.deliveries.insert(key.clone(), delivery.clone());
        self.journal.deliveries.push(Change {
            key,
            before,
            after: Some(delivery),
        });
    }

    fn remove_delivery(&mut self, key: &DeliveryKey) -> Option<Delivery> {
        let removed = self.deliveries.remove(key)?;
        self.journal.deliveries.push(Change {
            key: key.clone(),
            before: Some(removed.clone()),
            after: None,
        });
        Some(removed)
    }

    fn put_process(&mut self, process: Process) {
        let key = process.key();
        let before = self.processes.insert(key.clone(), process.clone());
        self.journal.processes.push(Change {
            key,
            before,
            after: Some(process),
        });
    }

    fn remove_process(&mut self, key: &ProcessKey) -> Option<Process> {
        let removed = self.processes.remove(key)?;
        self.journal.processes.push(Change {
            key: key.clone(),
            before: Some(removed.clone()),
            after: None,
        });
        Some(removed)
    }
}
