//! Assembly builds.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costflow_core::{ItemId, round_money, round_quantity, round_unit_cost};
use costflow_events::EventBus;
use costflow_inventory::events::AssemblyBuilt;
use costflow_inventory::{
    BillOfMaterials, InventoryError, InventoryEvent, InventoryResult, ItemLedger, LotMetadata,
};

use super::{InventoryEngine, now};
use crate::store::{ChangeSet, InventoryStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub quantity_built: Decimal,
    pub component_cost: Decimal,
    pub cost_per_unit: Decimal,
    pub new_quantity: Decimal,
}

impl<S, B> InventoryEngine<S, B>
where
    S: InventoryStore,
    B: EventBus<InventoryEvent>,
{
    /// Consume components per the bill of materials and stock the assembly.
    ///
    /// All components are checked before any is consumed; the consumption of
    /// every component and the receipt of the assembly commit together.
    pub fn build_assembly(
        &self,
        assembly_item_id: ItemId,
        quantity: Decimal,
        date: NaiveDate,
    ) -> InventoryResult<BuildOutcome> {
        let bom = self.bill_of_materials(assembly_item_id)?;
        let component_ids: Vec<ItemId> = bom.components().iter().map(|c| c.component_item_id).collect();

        let _guard = self.lock(component_ids.iter().copied().chain([assembly_item_id]))?;

        // The recipe is configuration, not item state; make sure it did not
        // change between reading it and taking the locks.
        let current = BillOfMaterials::from_edges(
            assembly_item_id,
            self.store.bill_of_materials(assembly_item_id)?,
        );
        if current != bom {
            return Err(InventoryError::ConcurrentModification {
                item_ids: vec![assembly_item_id],
            });
        }

        let mut components: BTreeMap<ItemId, ItemLedger> = BTreeMap::new();
        for id in &component_ids {
            components.insert(*id, self.load_ledger(*id)?);
        }
        let mut assembly = self.load_ledger(assembly_item_id)?;

        // Phase 1: validate every component before touching any lot.
        let requirements = bom.check_availability(quantity, |id| components.get(&id).map(ItemLedger::item))?;

        // Phase 2: consume in component id order.
        let mut total_component_cost = Decimal::ZERO;
        for req in &requirements {
            let ledger = components
                .get_mut(&req.component_item_id)
                .ok_or_else(|| InventoryError::item_not_found(req.component_item_id))?;
            total_component_cost += ledger.consume(req.required)?.cogs;
        }

        // Phase 3: produce.
        let cost_per_unit = total_component_cost / quantity;
        let receipt = assembly.receive(
            quantity,
            cost_per_unit,
            date,
            LotMetadata::reference(format!("assembly build of {quantity}")),
        )?;

        let mut changes = ChangeSet::new();
        for ledger in components.into_values() {
            changes.stage_ledger(ledger);
        }
        changes.stage_ledger(assembly);
        self.commit(changes)?;

        tracing::info!(
            %assembly_item_id,
            quantity = %quantity,
            component_cost = %round_money(total_component_cost),
            components = component_ids.len(),
            "assembly built"
        );
        self.publish([InventoryEvent::AssemblyBuilt(AssemblyBuilt {
            assembly_item_id,
            component_item_ids: component_ids,
            quantity,
            component_cost: total_component_cost,
            occurred_at: now(),
        })]);

        Ok(BuildOutcome {
            quantity_built: round_quantity(quantity),
            component_cost: round_money(total_component_cost),
            cost_per_unit: round_unit_cost(cost_per_unit),
            new_quantity: round_quantity(receipt.new_quantity),
        })
    }
}
