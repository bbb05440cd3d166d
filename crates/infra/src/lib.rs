//! Infrastructure layer: storage, item locks, configuration and the engine
//! that ties them to the inventory domain.

pub mod config;
pub mod engine;
pub mod locks;
pub mod reports;
pub mod store;

pub use config::EngineConfig;
pub use engine::{
    AdjustOutcome, BuildOutcome, InventoryEngine, PostOutcome, ReceiveOutcome, SaleOutcome,
    StartedCount,
};
pub use locks::{ItemLockGuard, ItemLocks};
pub use reports::{ValuationLine, ValuationReport};
pub use store::{ChangeSet, CommitReceipt, InMemoryInventoryStore, InventoryStore, StoreError};
