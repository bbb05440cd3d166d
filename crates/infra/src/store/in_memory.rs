use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use rust_decimal::Decimal;

use costflow_core::{AdjustmentId, AggregateRoot, CountId, ItemId, LotId};
use costflow_inventory::{AssemblyComponent, InventoryAdjustment, InventoryLot, Item, PhysicalCount};

use super::r#trait::{ChangeSet, CommitReceipt, InventoryStore, StoreError};

#[derive(Debug)]
struct Tables {
    items: BTreeMap<ItemId, Item>,
    lots: BTreeMap<LotId, InventoryLot>,
    lots_by_item: HashMap<ItemId, Vec<LotId>>,
    adjustments: Vec<InventoryAdjustment>,
    boms: HashMap<ItemId, Vec<AssemblyComponent>>,
    counts: HashMap<CountId, PhysicalCount>,
    next_lot_id: LotId,
    next_adjustment_id: AdjustmentId,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            lots: BTreeMap::new(),
            lots_by_item: HashMap::new(),
            adjustments: Vec::new(),
            boms: HashMap::new(),
            counts: HashMap::new(),
            next_lot_id: LotId(1),
            next_adjustment_id: AdjustmentId(1),
        }
    }
}

/// In-memory inventory tables.
///
/// A single `RwLock` makes each commit atomic with respect to readers; intended
/// for tests/dev and embedding.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the whole change set before anything is written.
    fn validate(tables: &Tables, changes: &ChangeSet) -> Result<(), StoreError> {
        for (item, expected) in &changes.items {
            let actual = tables.items.get(item.id()).map(|i| i.version());
            if !expected.matches(actual) {
                return Err(StoreError::VersionConflict {
                    record: format!("item {}", item.id()),
                    item_ids: vec![*item.id()],
                    expected: *expected,
                    actual,
                });
            }
        }

        for (count, expected) in &changes.counts {
            let actual = tables.counts.get(count.id()).map(|c| c.version());
            if !expected.matches(actual) {
                return Err(StoreError::VersionConflict {
                    record: format!("physical count {}", count.id()),
                    item_ids: count.item_ids(),
                    expected: *expected,
                    actual,
                });
            }
        }

        let staged_or_stored = |item_id: &ItemId| {
            changes.items.iter().any(|(i, _)| i.id() == item_id) || tables.items.contains_key(item_id)
        };

        for update in &changes.lot_updates {
            let lot = tables.lots.get(&update.lot_id).ok_or_else(|| {
                StoreError::Integrity(format!("lot {} does not exist", update.lot_id))
            })?;
            if update.remaining_quantity < Decimal::ZERO
                || update.remaining_quantity > lot.remaining_quantity()
            {
                return Err(StoreError::Integrity(format!(
                    "lot {} remaining quantity may only decrease (from {} to {})",
                    update.lot_id,
                    lot.remaining_quantity(),
                    update.remaining_quantity
                )));
            }
        }

        for lot in &changes.new_lots {
            if !staged_or_stored(&lot.item_id) {
                return Err(StoreError::Integrity(format!(
                    "lot references unknown item {}",
                    lot.item_id
                )));
            }
        }
        for adjustment in &changes.adjustments {
            if !staged_or_stored(&adjustment.item_id) {
                return Err(StoreError::Integrity(format!(
                    "adjustment references unknown item {}",
                    adjustment.item_id
                )));
            }
        }
        for (assembly_item_id, components) in &changes.bills_of_materials {
            for edge in components {
                if edge.assembly_item_id != *assembly_item_id || !staged_or_stored(&edge.component_item_id) {
                    return Err(StoreError::Integrity(format!(
                        "invalid bill of materials edge for assembly {assembly_item_id}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn item(&self, item_id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self.tables.read().items.get(&item_id).cloned())
    }

    fn items(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.tables.read().items.values().cloned().collect())
    }

    fn lots(&self, item_id: ItemId) -> Result<Vec<InventoryLot>, StoreError> {
        let tables = self.tables.read();
        let ids = tables.lots_by_item.get(&item_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(ids.iter().filter_map(|id| tables.lots.get(id).cloned()).collect())
    }

    fn adjustments(&self, item_id: ItemId) -> Result<Vec<InventoryAdjustment>, StoreError> {
        Ok(self
            .tables
            .read()
            .adjustments
            .iter()
            .filter(|a| a.item_id() == item_id)
            .cloned()
            .collect())
    }

    fn bill_of_materials(&self, assembly_item_id: ItemId) -> Result<Vec<AssemblyComponent>, StoreError> {
        Ok(self
            .tables
            .read()
            .boms
            .get(&assembly_item_id)
            .cloned()
            .unwrap_or_default())
    }

    fn physical_count(&self, count_id: CountId) -> Result<Option<PhysicalCount>, StoreError> {
        Ok(self.tables.read().counts.get(&count_id).cloned())
    }

    fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, StoreError> {
        let mut tables = self.tables.write();
        Self::validate(&tables, &changes)?;

        let mut receipt = CommitReceipt::default();

        for (mut item, _) in changes.items {
            item.bump_version();
            tables.items.insert(*item.id(), item);
        }

        for update in changes.lot_updates {
            if let Some(lot) = tables.lots.get_mut(&update.lot_id) {
                lot.set_remaining(update.remaining_quantity)
                    .map_err(|e| StoreError::Integrity(e.to_string()))?;
            }
        }

        for new_lot in changes.new_lots {
            let lot_id = tables.next_lot_id;
            tables.next_lot_id = lot_id.next();
            tables.lots_by_item.entry(new_lot.item_id).or_default().push(lot_id);
            tables.lots.insert(lot_id, new_lot.into_lot(lot_id));
            receipt.lot_ids.push(lot_id);
        }

        for adjustment in changes.adjustments {
            let adjustment_id = tables.next_adjustment_id;
            tables.next_adjustment_id = adjustment_id.next();
            tables.adjustments.push(adjustment.into_record(adjustment_id));
            receipt.adjustment_ids.push(adjustment_id);
        }

        for (assembly_item_id, components) in changes.bills_of_materials {
            tables.boms.insert(assembly_item_id, components);
        }

        for (mut count, _) in changes.counts {
            count.bump_version();
            tables.counts.insert(*count.id(), count);
        }

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use costflow_inventory::{ItemType, LotMetadata, LotUpdate, NewItem, NewLot};
    use rust_decimal_macros::dec;

    fn new_item() -> Item {
        Item::create(ItemId::new(), NewItem::new(ItemType::Inventory, "Bolt"), Utc::now()).unwrap()
    }

    fn lot_for(item_id: ItemId, quantity: Decimal) -> NewLot {
        NewLot {
            item_id,
            received_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            quantity,
            cost_per_unit: dec!(1),
            metadata: LotMetadata::default(),
        }
    }

    #[test]
    fn commit_assigns_sequential_lot_ids_and_bumps_versions() {
        let store = InMemoryInventoryStore::new();
        let item = new_item();
        let item_id = item.id_typed();

        let mut changes = ChangeSet::new();
        changes.insert_item(item);
        changes.new_lots.push(lot_for(item_id, dec!(5)));
        changes.new_lots.push(lot_for(item_id, dec!(6)));
        let receipt = store.commit(changes).unwrap();

        assert_eq!(receipt.lot_ids, vec![LotId(1), LotId(2)]);
        assert_eq!(store.item(item_id).unwrap().unwrap().version(), 1);
        assert_eq!(store.lots(item_id).unwrap().len(), 2);
    }

    #[test]
    fn stale_item_version_rejects_entire_commit() {
        let store = InMemoryInventoryStore::new();
        let item = new_item();
        let item_id = item.id_typed();
        let mut changes = ChangeSet::new();
        changes.insert_item(item);
        store.commit(changes).unwrap();

        let snapshot = store.item(item_id).unwrap().unwrap();
        let mut first = ChangeSet::new();
        first.update_item(snapshot.clone());
        store.commit(first).unwrap();

        let mut stale = ChangeSet::new();
        stale.update_item(snapshot);
        stale.new_lots.push(lot_for(item_id, dec!(1)));
        let err = store.commit(stale).unwrap_err();

        assert!(matches!(err, StoreError::VersionConflict { .. }));
        assert!(store.lots(item_id).unwrap().is_empty());
    }

    #[test]
    fn lot_updates_cannot_increase_remaining() {
        let store = InMemoryInventoryStore::new();
        let item = new_item();
        let item_id = item.id_typed();
        let mut changes = ChangeSet::new();
        changes.insert_item(item);
        changes.new_lots.push(lot_for(item_id, dec!(5)));
        let receipt = store.commit(changes).unwrap();

        let mut grow = ChangeSet::new();
        grow.lot_updates.push(LotUpdate {
            lot_id: receipt.lot_ids[0],
            remaining_quantity: dec!(9),
        });
        assert!(matches!(store.commit(grow), Err(StoreError::Integrity(_))));
    }

    #[test]
    fn lots_for_unknown_items_are_rejected() {
        let store = InMemoryInventoryStore::new();
        let mut changes = ChangeSet::new();
        changes.new_lots.push(lot_for(ItemId::new(), dec!(1)));
        assert!(matches!(store.commit(changes), Err(StoreError::Integrity(_))));
    }
}
