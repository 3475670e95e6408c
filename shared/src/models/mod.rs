//! Domain models for the Inventory Ledger

mod cargo;
mod delivery;
mod inventory_log;
mod item;
mod process;

pub use cargo::*;
pub use delivery::*;
pub use inventory_log::*;
pub use item::*;
pub use process::*;
