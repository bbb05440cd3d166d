//! Inventory engine: the service façade over store, locks and bus.
//!
//! Every mutating operation follows the same shape:
//!
//! ```text
//! lock items (sorted, bounded wait)
//!   ↓
//! load committed snapshots into ItemLedgers
//!   ↓
//! validate + compute on the working copies (no side effects on failure)
//!   ↓
//! commit one ChangeSet (version-checked, all-or-nothing)
//!   ↓
//! publish InventoryEvents
//! ```
//!
//! Reads (`get_item`, lot/adjustment listings, reports) take no item lock and
//! observe committed state only.

mod assembly;
mod catalog;
mod costing;
mod physical_count;

use chrono::{DateTime, Utc};

use costflow_core::ItemId;
use costflow_events::{Event, EventBus, InMemoryEventBus, Subscription};
use costflow_inventory::{InventoryError, InventoryEvent, InventoryResult, Item, ItemLedger};

use crate::config::EngineConfig;
use crate::locks::{ItemLockGuard, ItemLocks};
use crate::store::{ChangeSet, CommitReceipt, InMemoryInventoryStore, InventoryStore};

pub use assembly::BuildOutcome;
pub use costing::{AdjustOutcome, ReceiveOutcome, SaleOutcome};
pub use physical_count::{PostOutcome, StartedCount};

/// Inventory valuation and lot-tracking engine.
///
/// The store is injected; there is no process-wide state. Share one engine
/// (e.g. behind an `Arc`) between all callers of a store so they share its
/// item locks.
#[derive(Debug)]
pub struct InventoryEngine<S, B = InMemoryEventBus<InventoryEvent>> {
    store: S,
    bus: B,
    locks: ItemLocks,
    config: EngineConfig,
}

impl InventoryEngine<InMemoryInventoryStore> {
    /// Engine over fresh in-memory tables and bus.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(InMemoryInventoryStore::new(), InMemoryEventBus::new(), config)
    }
}

impl<S, B> InventoryEngine<S, B> {
    pub fn new(store: S, bus: B, config: EngineConfig) -> Self {
        Self {
            store,
            bus,
            locks: ItemLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S, B> InventoryEngine<S, B>
where
    S: InventoryStore,
    B: EventBus<InventoryEvent>,
{
    /// Follow committed inventory changes.
    pub fn subscribe(&self) -> Subscription<InventoryEvent> {
        self.bus.subscribe()
    }

    fn lock(&self, item_ids: impl IntoIterator<Item = ItemId>) -> InventoryResult<ItemLockGuard<'_>> {
        self.locks.acquire(item_ids, self.config.lock_timeout)
    }

    fn load_item(&self, item_id: ItemId) -> InventoryResult<Item> {
        self.store
            .item(item_id)?
            .ok_or_else(|| InventoryError::item_not_found(item_id))
    }

    fn load_ledger(&self, item_id: ItemId) -> InventoryResult<ItemLedger> {
        let item = self.load_item(item_id)?;
        let lots = self.store.lots(item_id)?;
        ItemLedger::new(item, lots)
    }

    fn commit(&self, changes: ChangeSet) -> InventoryResult<CommitReceipt> {
        self.store.commit(changes).map_err(|err| {
            let err = InventoryError::from(err);
            if err.is_retryable() {
                tracing::warn!(error = %err, "inventory commit rejected");
            }
            err
        })
    }

    /// Publication happens after commit; failures are logged, never rolled back.
    fn publish(&self, events: impl IntoIterator<Item = InventoryEvent>) {
        for event in events {
            let event_type = event.event_type();
            if let Err(err) = self.bus.publish(event) {
                tracing::warn!(event_type, error = ?err, "failed to publish inventory event");
            }
        }
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}
