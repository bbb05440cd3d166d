//! Per-item exclusive locks with bounded waits.
//!
//! An operation locks every item it mutates up front. The whole id set is
//! taken at once (sorted and de-duplicated), so two operations sharing items
//! can never hold one lock each while waiting for the other.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use costflow_core::ItemId;
use costflow_inventory::InventoryError;

#[derive(Debug, Default)]
pub struct ItemLocks {
    held: Mutex<HashSet<ItemId>>,
    released: Condvar,
}

impl ItemLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock all `item_ids`, waiting at most `timeout`.
    ///
    /// Fails with the retryable `ConcurrentModification` when any of the items
    /// stays locked past the deadline.
    pub fn acquire(
        &self,
        item_ids: impl IntoIterator<Item = ItemId>,
        timeout: Duration,
    ) -> Result<ItemLockGuard<'_>, InventoryError> {
        let mut item_ids: Vec<ItemId> = item_ids.into_iter().collect();
        item_ids.sort();
        item_ids.dedup();

        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock();
        while item_ids.iter().any(|id| held.contains(id)) {
            if self.released.wait_until(&mut held, deadline).timed_out()
                && item_ids.iter().any(|id| held.contains(id))
            {
                tracing::warn!(item_ids = ?item_ids, timeout_ms = timeout.as_millis() as u64, "item lock wait timed out");
                return Err(InventoryError::ConcurrentModification { item_ids });
            }
        }
        held.extend(item_ids.iter().copied());

        Ok(ItemLockGuard {
            locks: self,
            item_ids,
        })
    }

    pub fn is_locked(&self, item_id: ItemId) -> bool {
        self.held.lock().contains(&item_id)
    }
}

/// Releases its items on drop.
#[derive(Debug)]
pub struct ItemLockGuard<'a> {
    locks: &'a ItemLocks,
    item_ids: Vec<ItemId>,
}

impl ItemLockGuard<'_> {
    /// Locked ids in ascending order.
    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }
}

impl Drop for ItemLockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock();
        for id in &self.item_ids {
            held.remove(id);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
