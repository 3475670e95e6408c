//! HTTP handlers

pub mod deliveries;
pub mod health;
pub mod inventory_log;
pub mod items;
pub mod processes;

pub use deliveries::*;
pub use health::*;
pub use inventory_log::*;
pub use items::*;
pub use processes::*;
