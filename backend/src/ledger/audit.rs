//! Append-only inventory audit log

use shared::{InventoryLogEntry, InventoryLogFilter};

#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: Vec<InventoryLogEntry>,
    next_sequence: u64,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_sequence: 1,
        }
    }

    /// Log rebuilt from stored entries, continuing after the highest sequence
    pub fn from_entries(entries: Vec<InventoryLogEntry>) -> Self {
        let next_sequence = entries.iter().map(|e| e.sequence).max().unwrap_or(0) + 1;
        Self {
            entries,
            next_sequence,
        }
    }

    /// Append an entry, assigning the next sequence number
    pub fn append(&mut self, mut entry: InventoryLogEntry) -> u64 {
        let sequence = self.next_sequence;
        entry.sequence = sequence;
        self.entries.push(entry);
        self.next_sequence += 1;
        sequence
    }

    /// Drop entries from `sequence` onwards; only used to undo a failed commit
    pub(crate) fn truncate(&mut self, sequence: u64) {
        self.entries.retain(|e| e.sequence < sequence);
        self.next_sequence = sequence;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[InventoryLogEntry] {
        &self.entries
    }

    /// Entries matching the filter, oldest first
    pub fn query(&self, filter: &InventoryLogFilter) -> Vec<&InventoryLogEntry> {
        self.entries.iter().filter(|e| filter.matches(e)).collect()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
