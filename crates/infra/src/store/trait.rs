use thiserror::Error;

use costflow_core::{AdjustmentId, AggregateRoot, CountId, ExpectedVersion, ItemId, LotId};
use costflow_inventory::{
    AssemblyComponent, InventoryAdjustment, InventoryError, InventoryLot, Item, ItemLedger,
    LotUpdate, NewAdjustment, NewLot, PhysicalCount,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A staged record was read at a version that is no longer current.
    #[error("version conflict on {record}: expected {expected:?}, found {actual:?}")]
    VersionConflict {
        record: String,
        item_ids: Vec<ItemId>,
        expected: ExpectedVersion,
        actual: Option<u64>,
    },

    /// The change set references missing records or breaks a table rule.
    #[error("integrity violation: {0}")]
    Integrity(String),
}

impl From<StoreError> for InventoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::VersionConflict { item_ids, .. } => {
                InventoryError::ConcurrentModification { item_ids }
            }
            StoreError::Integrity(msg) => InventoryError::Validation(msg),
        }
    }
}

/// Every write of one engine operation.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub items: Vec<(Item, ExpectedVersion)>,
    pub new_lots: Vec<NewLot>,
    pub lot_updates: Vec<LotUpdate>,
    pub adjustments: Vec<NewAdjustment>,
    pub bills_of_materials: Vec<(ItemId, Vec<AssemblyComponent>)>,
    pub counts: Vec<(PhysicalCount, ExpectedVersion)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
            && self.new_lots.is_empty()
            && self.lot_updates.is_empty()
            && self.adjustments.is_empty()
            && self.bills_of_materials.is_empty()
            && self.counts.is_empty()
    }

    pub fn insert_item(&mut self, item: Item) {
        self.items.push((item, ExpectedVersion::New));
    }

    /// Stage a modified copy of an item read at `item.version()`.
    pub fn update_item(&mut self, item: Item) {
        let expected = ExpectedVersion::Exact(item.version());
        self.items.push((item, expected));
    }

    /// Stage the item and lot writes of a ledger.
    pub fn stage_ledger(&mut self, ledger: ItemLedger) {
        let changes = ledger.into_changes();
        self.update_item(changes.item);
        self.lot_updates.extend(changes.lot_updates);
        self.new_lots.extend(changes.new_lots);
    }

    pub fn append_adjustment(&mut self, adjustment: NewAdjustment) {
        self.adjustments.push(adjustment);
    }

    pub fn put_bill_of_materials(&mut self, assembly_item_id: ItemId, components: Vec<AssemblyComponent>) {
        self.bills_of_materials.push((assembly_item_id, components));
    }

    pub fn insert_count(&mut self, count: PhysicalCount) {
        self.counts.push((count, ExpectedVersion::New));
    }

    pub fn update_count(&mut self, count: PhysicalCount) {
        let expected = ExpectedVersion::Exact(count.version());
        self.counts.push((count, expected));
    }
}

/// Identifiers assigned during commit, in staging order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub lot_ids: Vec<LotId>,
    pub adjustment_ids: Vec<AdjustmentId>,
}

/// Inventory tables: items, append-only lots and adjustments, bills of
/// materials and physical counts.
///
/// Reads return committed state only. `commit` is all-or-nothing.
pub trait InventoryStore: Send + Sync {
    fn item(&self, item_id: ItemId) -> Result<Option<Item>, StoreError>;

    /// All items, ordered by id.
    fn items(&self) -> Result<Vec<Item>, StoreError>;

    /// Lots of one item, ordered by lot id.
    fn lots(&self, item_id: ItemId) -> Result<Vec<InventoryLot>, StoreError>;

    /// Adjustments of one item, ordered by adjustment id.
    fn adjustments(&self, item_id: ItemId) -> Result<Vec<InventoryAdjustment>, StoreError>;

    fn bill_of_materials(&self, assembly_item_id: ItemId) -> Result<Vec<AssemblyComponent>, StoreError>;

    fn physical_count(&self, count_id: CountId) -> Result<Option<PhysicalCount>, StoreError>;

    fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, StoreError>;
}

impl<S> InventoryStore for std::sync::Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn item(&self, item_id: ItemId) -> Result<Option<Item>, StoreError> {
        (**self).item(item_id)
    }

    fn items(&self) -> Result<Vec<Item>, StoreError> {
        (**self).items()
    }

    fn lots(&self, item_id: ItemId) -> Result<Vec<InventoryLot>, StoreError> {
        (**self).lots(item_id)
    }

    fn adjustments(&self, item_id: ItemId) -> Result<Vec<InventoryAdjustment>, StoreError> {
        (**self).adjustments(item_id)
    }

    fn bill_of_materials(&self, assembly_item_id: ItemId) -> Result<Vec<AssemblyComponent>, StoreError> {
        (**self).bill_of_materials(assembly_item_id)
    }

    fn physical_count(&self, count_id: CountId) -> Result<Option<PhysicalCount>, StoreError> {
        (**self).physical_count(count_id)
    }

    fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, StoreError> {
        (**self).commit(changes)
    }
}
