//! Inventory valuation and lot-tracking domain.
//!
//! This crate contains business rules only (no IO, no storage, no locking):
//! item catalog records, the lot ledger, FIFO/LIFO/average costing, bills of
//! materials and physical counts. `costflow-infra` wires them to a store.

pub mod adjustment;
pub mod assembly;
pub mod costing;
pub mod error;
pub mod events;
pub mod item;
pub mod lot;
pub mod physical_count;

pub use adjustment::{AdjustmentSource, InventoryAdjustment, NewAdjustment};
pub use assembly::{AssemblyComponent, BillOfMaterials, ComponentRequirement};
pub use costing::{
    AdjustmentEffect, Consumption, ItemLedger, LedgerChanges, LotDraw, LotUpdate, Receipt,
    consumption_order,
};
pub use error::{InventoryError, InventoryResult};
pub use events::InventoryEvent;
pub use item::{Item, ItemKind, ItemType, ItemUpdate, NewItem, StockLevels, ValuationMethod};
pub use lot::{InventoryLot, LotMetadata, NewLot};
pub use physical_count::{CountStatus, PhysicalCount, PhysicalCountLine};
