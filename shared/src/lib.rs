//! Shared types and models for the Inventory Ledger
//!
//! This crate contains the domain records (items, deliveries, processes,
//! inventory log entries), the pure cargo planning rules and the input
//! validation shared between the backend engine and the WASM preview module.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
