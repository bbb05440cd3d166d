//! Item catalog operations and ledger reads.

use rust_decimal::Decimal;

use costflow_core::ItemId;
use costflow_events::EventBus;
use costflow_inventory::events::ItemCreated;
use costflow_inventory::{
    BillOfMaterials, InventoryAdjustment, InventoryError, InventoryEvent, InventoryLot,
    InventoryResult, Item, ItemUpdate, NewItem,
};

use super::{InventoryEngine, now};
use crate::store::{ChangeSet, InventoryStore};

impl<S, B> InventoryEngine<S, B>
where
    S: InventoryStore,
    B: EventBus<InventoryEvent>,
{
    /// Add an item to the catalog with nothing on hand.
    pub fn create_item(&self, fields: NewItem) -> InventoryResult<Item> {
        let item = Item::create(ItemId::new(), fields, now())?;
        let item_id = item.id_typed();
        let item_type = item.item_type();

        let mut changes = ChangeSet::new();
        changes.insert_item(item);
        self.commit(changes)?;

        tracing::info!(%item_id, ?item_type, "item created");
        self.publish([InventoryEvent::ItemCreated(ItemCreated {
            item_id,
            item_type,
            occurred_at: now(),
        })]);
        self.get_item(item_id)
    }

    /// Edit catalog metadata. Quantity and value are not reachable from here.
    pub fn update_item(&self, item_id: ItemId, update: ItemUpdate) -> InventoryResult<Item> {
        let _guard = self.lock([item_id])?;
        let mut item = self.load_item(item_id)?;
        let has_lots = !self.store.lots(item_id)?.is_empty();
        item.apply_update(update, has_lots)?;

        let mut changes = ChangeSet::new();
        changes.update_item(item);
        self.commit(changes)?;

        tracing::info!(%item_id, "item updated");
        self.get_item(item_id)
    }

    /// Latest committed snapshot of an item.
    pub fn get_item(&self, item_id: ItemId) -> InventoryResult<Item> {
        self.load_item(item_id)
    }

    pub fn list_items(&self) -> InventoryResult<Vec<Item>> {
        Ok(self.store.items()?)
    }

    /// Lot ledger of an item, in lot id order (exhausted lots included).
    pub fn lots_for_item(&self, item_id: ItemId) -> InventoryResult<Vec<InventoryLot>> {
        self.load_item(item_id)?;
        Ok(self.store.lots(item_id)?)
    }

    pub fn adjustments_for_item(&self, item_id: ItemId) -> InventoryResult<Vec<InventoryAdjustment>> {
        self.load_item(item_id)?;
        Ok(self.store.adjustments(item_id)?)
    }

    /// Replace the recipe of an assembly item.
    pub fn set_bill_of_materials(
        &self,
        assembly_item_id: ItemId,
        components: Vec<(ItemId, Decimal)>,
    ) -> InventoryResult<BillOfMaterials> {
        let _guard = self.lock([assembly_item_id])?;
        let assembly = self.load_item(assembly_item_id)?;

        let mut items = Vec::with_capacity(components.len());
        for (component_item_id, _) in &components {
            match self.store.item(*component_item_id)? {
                Some(item) => items.push(item),
                None => return Err(InventoryError::item_not_found(*component_item_id)),
            }
        }
        let bom = BillOfMaterials::new(&assembly, components, |id| {
            items.iter().find(|i| i.id_typed() == id)
        })?;

        let mut changes = ChangeSet::new();
        changes.put_bill_of_materials(assembly_item_id, bom.components().to_vec());
        self.commit(changes)?;

        tracing::info!(%assembly_item_id, components = bom.components().len(), "bill of materials saved");
        Ok(bom)
    }

    pub fn bill_of_materials(&self, assembly_item_id: ItemId) -> InventoryResult<BillOfMaterials> {
        self.load_item(assembly_item_id)?.require_assembly()?;
        let edges = self.store.bill_of_materials(assembly_item_id)?;
        Ok(BillOfMaterials::from_edges(assembly_item_id, edges))
    }
}
