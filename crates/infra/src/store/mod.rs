//! Repository boundary for inventory state.
//!
//! The engine reads committed snapshots through [`InventoryStore`] and writes
//! through a single [`ChangeSet`] per operation, which the store applies
//! atomically after checking every expected version.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryInventoryStore;
pub use r#trait::{ChangeSet, CommitReceipt, InventoryStore, StoreError};
