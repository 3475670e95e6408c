//! Async services over the ledger engine

pub mod delivery;
pub mod inventory_log;
pub mod item;
pub mod process;

pub use delivery::DeliveryService;
pub use inventory_log::InventoryLogService;
pub use item::ItemService;
pub use process::ProcessService;
