//! Bills of materials and the assembly build check.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costflow_core::ItemId;

use crate::error::{InventoryError, InventoryResult, checked, ensure_positive};
use crate::item::Item;

/// One BOM edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyComponent {
    pub assembly_item_id: ItemId,
    pub component_item_id: ItemId,
    pub quantity_per_unit: Decimal,
}

/// Quantity of one component a build needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRequirement {
    pub component_item_id: ItemId,
    pub required: Decimal,
}

/// The recipe of an assembly item, ordered by component id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillOfMaterials {
    assembly_item_id: ItemId,
    components: Vec<AssemblyComponent>,
}

impl BillOfMaterials {
    /// Validate and normalize a recipe.
    ///
    /// `items` must resolve every referenced id; the assembly must be an
    /// `Assembly` item and each component a distinct stocked item other than
    /// the assembly itself.
    pub fn new<'a>(
        assembly: &Item,
        components: impl IntoIterator<Item = (ItemId, Decimal)>,
        items: impl Fn(ItemId) -> Option<&'a Item>,
    ) -> InventoryResult<Self> {
        assembly.require_assembly()?;
        let assembly_item_id = assembly.id_typed();

        let mut by_component: BTreeMap<ItemId, AssemblyComponent> = BTreeMap::new();
        for (component_item_id, quantity_per_unit) in components {
            ensure_positive("quantity_per_unit", quantity_per_unit)?;
            if component_item_id == assembly_item_id {
                return Err(InventoryError::validation(
                    "an assembly cannot list itself as a component",
                ));
            }
            let component = items(component_item_id)
                .ok_or_else(|| InventoryError::item_not_found(component_item_id))?;
            component.require_stock()?;

            let edge = AssemblyComponent {
                assembly_item_id,
                component_item_id,
                quantity_per_unit,
            };
            if by_component.insert(component_item_id, edge).is_some() {
                return Err(InventoryError::validation(format!(
                    "component {component_item_id} is listed more than once"
                )));
            }
        }

        Ok(Self {
            assembly_item_id,
            components: by_component.into_values().collect(),
        })
    }

    /// Rebuild from stored edges (already validated when saved).
    pub fn from_edges(assembly_item_id: ItemId, mut components: Vec<AssemblyComponent>) -> Self {
        components.sort_by_key(|c| c.component_item_id);
        Self {
            assembly_item_id,
            components,
        }
    }

    pub fn assembly_item_id(&self) -> ItemId {
        self.assembly_item_id
    }

    pub fn components(&self) -> &[AssemblyComponent] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component quantities needed to build `quantity` units, by component id.
    pub fn requirements(&self, quantity: Decimal) -> InventoryResult<Vec<ComponentRequirement>> {
        self.components
            .iter()
            .map(|c| {
                Ok(ComponentRequirement {
                    component_item_id: c.component_item_id,
                    required: checked(
                        "component requirement",
                        c.quantity_per_unit.checked_mul(quantity),
                    )?,
                })
            })
            .collect()
    }

    /// Build check: every component must have enough on hand.
    ///
    /// Fails on the first short component (in component id order) and
    /// performs no mutation.
    pub fn check_availability<'a>(
        &self,
        quantity: Decimal,
        items: impl Fn(ItemId) -> Option<&'a Item>,
    ) -> InventoryResult<Vec<ComponentRequirement>> {
        ensure_positive("quantity_to_build", quantity)?;
        if self.is_empty() {
            return Err(InventoryError::validation(format!(
                "assembly {} has no bill of materials",
                self.assembly_item_id
            )));
        }

        let requirements = self.requirements(quantity)?;
        for req in &requirements {
            let component = items(req.component_item_id)
                .ok_or_else(|| InventoryError::item_not_found(req.component_item_id))?;
            let on_hand = component.require_stock()?.quantity_on_hand;
            if on_hand < req.required {
                return Err(InventoryError::insufficient(
                    req.component_item_id,
                    req.required,
                    on_hand,
                ));
            }
        }
        Ok(requirements)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::item::{ItemType, NewItem};

    fn make(item_type: ItemType, name: &str) -> Item {
        Item::create(ItemId::new(), NewItem::new(item_type, name), Utc::now()).unwrap()
    }

    #[test]
    fn components_are_sorted_and_scaled() {
        let kit = make(ItemType::Assembly, "Kit");
        let a = make(ItemType::Inventory, "A");
        let b = make(ItemType::Inventory, "B");
        let items: HashMap<ItemId, Item> =
            [(a.id_typed(), a.clone()), (b.id_typed(), b.clone())].into();

        let bom = BillOfMaterials::new(
            &kit,
            [(b.id_typed(), dec!(3)), (a.id_typed(), dec!(2))],
            |id| items.get(&id),
        )
        .unwrap();

        let reqs = bom.requirements(dec!(5)).unwrap();
        let mut expected = vec![(a.id_typed(), dec!(10)), (b.id_typed(), dec!(15))];
        expected.sort_by_key(|(id, _)| *id);
        let got: Vec<_> = reqs.iter().map(|r| (r.component_item_id, r.required)).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn invalid_recipes_are_rejected() {
        let kit = make(ItemType::Assembly, "Kit");
        let part = make(ItemType::Inventory, "Part");
        let labor = make(ItemType::Service, "Labor");
        let items: HashMap<ItemId, Item> = [
            (part.id_typed(), part.clone()),
            (labor.id_typed(), labor.clone()),
            (kit.id_typed(), kit.clone()),
        ]
        .into();
        let lookup = |id: ItemId| items.get(&id);

        assert!(matches!(
            BillOfMaterials::new(&part, [(kit.id_typed(), dec!(1))], lookup),
            Err(InventoryError::InvalidItemType { .. })
        ));
        assert!(matches!(
            BillOfMaterials::new(&kit, [(labor.id_typed(), dec!(1))], lookup),
            Err(InventoryError::InvalidItemType { .. })
        ));
        assert!(BillOfMaterials::new(&kit, [(kit.id_typed(), dec!(1))], lookup).is_err());
        assert!(BillOfMaterials::new(&kit, [(part.id_typed(), dec!(0))], lookup).is_err());
        assert!(
            BillOfMaterials::new(
                &kit,
                [(part.id_typed(), dec!(1)), (part.id_typed(), dec!(2))],
                lookup
            )
            .is_err()
        );
        assert!(matches!(
            BillOfMaterials::new(&kit, [(ItemId::new(), dec!(1))], lookup),
            Err(InventoryError::NotFound { .. })
        ));
    }

    #[test]
    fn oversized_builds_fail_validation() {
        let kit = make(ItemType::Assembly, "Kit");
        let part = make(ItemType::Inventory, "Part");
        let items: HashMap<ItemId, Item> = [(part.id_typed(), part.clone())].into();
        let bom =
            BillOfMaterials::new(&kit, [(part.id_typed(), dec!(2))], |id| items.get(&id)).unwrap();

        assert!(matches!(
            bom.requirements(Decimal::MAX),
            Err(InventoryError::Validation(msg)) if msg.contains("overflows")
        ));
        assert!(matches!(
            bom.check_availability(Decimal::MAX, |id| items.get(&id)),
            Err(InventoryError::Validation(_))
        ));
    }

    #[test]
    fn empty_recipe_cannot_be_built() {
        let bom = BillOfMaterials::from_edges(ItemId::new(), vec![]);
        let err = bom.check_availability(dec!(1), |_| None).unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }
}
