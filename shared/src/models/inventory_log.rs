//! Inventory audit log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Metadata, Quantity};

/// Kind of item mutation recorded by a log entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogAction {
    NewItem,
    EditItem,
    DelItem,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::NewItem => "newitem",
            LogAction::EditItem => "edititem",
            LogAction::DelItem => "delitem",
        }
    }
}

impl std::str::FromStr for LogAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "newitem" => Ok(LogAction::NewItem),
            "edititem" => Ok(LogAction::EditItem),
            "delitem" => Ok(LogAction::DelItem),
            other => Err(format!("unknown log action: {}", other)),
        }
    }
}

impl std::fmt::Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operations that cause inventory changes, recorded as the parent action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerAction {
    NewDelivery,
    EditDelivery,
    CancelDelivery,
    NewProcess,
    EditProcess,
    CancelProcess,
    NewItem,
    EditItem,
    DelItem,
}

impl LedgerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAction::NewDelivery => "newdelivery",
            LedgerAction::EditDelivery => "editdelivery",
            LedgerAction::CancelDelivery => "canceldelivery",
            LedgerAction::NewProcess => "newprocess",
            LedgerAction::EditProcess => "editprocess",
            LedgerAction::CancelProcess => "cancelprocess",
            LedgerAction::NewItem => "newitem",
            LedgerAction::EditItem => "edititem",
            LedgerAction::DelItem => "delitem",
        }
    }
}

impl std::fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable record of one quantity change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryLogEntry {
    /// Strictly increasing position in the log
    pub sequence: u64,
    pub actor: String,
    pub company: String,
    pub item: String,
    pub site: String,
    pub product: String,
    pub delivery: Option<String>,
    pub metadata: Metadata,
    pub action: LogAction,
    pub parent_action: String,
    pub parent_action_id: String,
    pub timestamp: DateTime<Utc>,
    pub old_quantity: Quantity,
    pub new_quantity: Quantity,
    pub delta: Quantity,
    /// SHA-256 of the request that caused the change
    pub fingerprint: String,
    pub version: String,
}

impl InventoryLogEntry {
    /// `new - old == delta`
    pub fn is_consistent(&self) -> bool {
        self.new_quantity - self.old_quantity == self.delta
    }
}

/// Audit query filter; every present field must match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryLogFilter {
    pub item: Option<String>,
    pub site: Option<String>,
    pub product: Option<String>,
    pub company: Option<String>,
    pub actor: Option<String>,
    pub parent_action_id: Option<String>,
}

impl InventoryLogFilter {
    pub fn matches(&self, entry: &InventoryLogEntry) -> bool {
        self.item.as_ref().map_or(true, |v| *v == entry.item)
            && self.site.as_ref().map_or(true, |v| *v == entry.site)
            && self.product.as_ref().map_or(true, |v| *v == entry.product)
            && self.company.as_ref().map_or(true, |v| *v == entry.company)
            && self.actor.as_ref().map_or(true, |v| *v == entry.actor)
            && self
                .parent_action_id
                .as_ref()
                .map_or(true, |v| *v == entry.parent_action_id)
    }
}
