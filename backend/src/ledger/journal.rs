//! Changes made by committed operations, kept until they are persisted

use shared::{Delivery, DeliveryKey, InventoryLogEntry, Item, ItemKey, Process, ProcessKey};

/// One record's state before and after a commit; `None` means absent
#[derive(Debug, Clone, PartialEq)]
pub struct Change<K, V> {
    pub key: K,
    pub before: Option<V>,
    pub after: Option<V>,
}

/// Everything committed since the journal was last drained, in commit order
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    pub items: Vec<Change<ItemKey, Item>>,
    /// Audit entries with their sequence numbers assigned
    pub entries: Vec<InventoryLogEntry>,
    pub deliveries: Vec<Change<DeliveryKey, Delivery>>,
    pub processes: Vec<Change<ProcessKey, Process>>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
            && self.entries.is_empty()
            && self.deliveries.is_empty()
            && self.processes.is_empty()
    }
}
