//! Ledger engine errors

use serde::Serialize;
use shared::{Activity, CargoError, EntityKind, ItemKey, Quantity, SiteRef};
use thiserror::Error;

/// Error taxonomy the engine reports to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    InsufficientInventory,
    InvalidStateTransition,
    Unauthorized,
}

/// Failures of a ledger operation; any of these aborts the whole operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("quantity must be zero or positive for item {item}, got {quantity}")]
    NegativeQuantity { item: String, quantity: Quantity },

    #[error("process {0} has no inputs")]
    EmptyInputs(String),

    #[error("activity {activity} is not valid for a {kind}")]
    InvalidActivity { kind: EntityKind, activity: Activity },

    #[error("item {key} does not exist and cannot be created with delta {delta}")]
    ItemNotFound { key: ItemKey, delta: Quantity },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("site {0} not found")]
    SiteNotFound(SiteRef),

    #[error("company {company} is not a party to {entity} {id}")]
    CompanyMismatch {
        entity: &'static str,
        id: String,
        company: String,
    },

    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("insufficient inventory for {key}: {on_hand} on hand, change of {delta}")]
    InsufficientInventory {
        key: ItemKey,
        on_hand: Quantity,
        delta: Quantity,
    },

    #[error("quantity of {key} would overflow applying {delta}")]
    QuantityOverflow { key: ItemKey, delta: Quantity },

    #[error("{entity} {id} cannot move from {from} to {to}")]
    InvalidStateTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    #[error("{0}")]
    Unauthorized(String),
}

impl LedgerError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }

    pub fn transition(
        entity: &'static str,
        id: impl ToString,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        LedgerError::InvalidStateTransition {
            entity,
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation { .. }
            | LedgerError::NegativeQuantity { .. }
            | LedgerError::EmptyInputs(_)
            | LedgerError::InvalidActivity { .. }
            | LedgerError::QuantityOverflow { .. } => ErrorKind::Validation,
            LedgerError::ItemNotFound { .. }
            | LedgerError::NotFound { .. }
            | LedgerError::SiteNotFound(_) => ErrorKind::NotFound,
            LedgerError::AlreadyExists { .. } => ErrorKind::Conflict,
            LedgerError::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
            LedgerError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            LedgerError::CompanyMismatch { .. } | LedgerError::Unauthorized(_) => {
                ErrorKind::Unauthorized
            }
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation { .. } => "VALIDATION_ERROR",
            LedgerError::NegativeQuantity { .. } => "NEGATIVE_QUANTITY",
            LedgerError::EmptyInputs(_) => "EMPTY_INPUTS",
            LedgerError::InvalidActivity { .. } => "INVALID_ACTIVITY",
            LedgerError::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            LedgerError::NotFound { .. } => "NOT_FOUND",
            LedgerError::SiteNotFound(_) => "SITE_NOT_FOUND",
            LedgerError::CompanyMismatch { .. } => "COMPANY_MISMATCH",
            LedgerError::AlreadyExists { .. } => "ALREADY_EXISTS",
            LedgerError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            LedgerError::QuantityOverflow { .. } => "QUANTITY_OVERFLOW",
            LedgerError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            LedgerError::Unauthorized(_) => "UNAUTHORIZED",
        }
    }

    /// Offending field, when the error is about one
    pub fn field(&self) -> Option<String> {
        match self {
            LedgerError::Validation { field, .. } => Some(field.clone()),
            LedgerError::NegativeQuantity { item, .. } => Some(item.clone()),
            LedgerError::QuantityOverflow { .. } => Some("quantity".to_string()),
            _ => None,
        }
    }
}

impl From<CargoError> for LedgerError {
    fn from(err: CargoError) -> Self {
        match err {
            CargoError::NegativeQuantity { item, quantity } => {
                LedgerError::NegativeQuantity { item, quantity }
            }
            CargoError::InvalidActivity { kind, activity, .. } => {
                LedgerError::InvalidActivity { kind, activity }
            }
            CargoError::MissingProduct { item } => {
                LedgerError::validation(item, "product is missing")
            }
        }
    }
}

/// Result type alias for engine operations
pub type LedgerResult<T> = Result<T, LedgerError>;
