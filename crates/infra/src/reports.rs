//! Valuation and reorder reports.
//!
//! Built from committed item snapshots; each line carries the item's stock
//! levels rounded for display. Non-stocked items never appear.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costflow_core::{ItemId, round_money, round_quantity, round_unit_cost};
use costflow_events::EventBus;
use costflow_inventory::{InventoryEvent, InventoryResult, Item, ItemType, ValuationMethod};

use crate::engine::InventoryEngine;
use crate::store::InventoryStore;

/// Read model: valuation of one stocked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationLine {
    pub item_id: ItemId,
    pub name: String,
    pub sku: Option<String>,
    pub item_type: ItemType,
    pub valuation_method: ValuationMethod,
    pub quantity_on_hand: Decimal,
    pub average_cost: Decimal,
    pub asset_value: Decimal,
    pub reorder_point: Decimal,
}

impl ValuationLine {
    fn from_item(item: &Item) -> Option<Self> {
        let stock = item.stock()?;
        Some(Self {
            item_id: item.id_typed(),
            name: item.name().to_string(),
            sku: item.sku().map(str::to_string),
            item_type: item.item_type(),
            valuation_method: stock.valuation_method,
            quantity_on_hand: round_quantity(stock.quantity_on_hand),
            average_cost: round_unit_cost(stock.average_cost),
            asset_value: round_money(stock.asset_value),
            reorder_point: round_quantity(stock.reorder_point),
        })
    }
}

/// Summary of total inventory value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub lines: Vec<ValuationLine>,
    pub total_items: usize,
    pub total_quantity: Decimal,
    /// Sum of unrounded asset values, rounded once.
    pub total_value: Decimal,
}

impl<S, B> InventoryEngine<S, B>
where
    S: InventoryStore,
    B: EventBus<InventoryEvent>,
{
    /// Value of every stocked item, ordered by item id.
    pub fn valuation_report(&self) -> InventoryResult<ValuationReport> {
        let items = self.store().items()?;

        let mut total_quantity = Decimal::ZERO;
        let mut total_value = Decimal::ZERO;
        let mut lines = Vec::new();
        for item in &items {
            let Some(stock) = item.stock() else { continue };
            total_quantity += stock.quantity_on_hand;
            total_value += stock.asset_value;
            lines.extend(ValuationLine::from_item(item));
        }

        Ok(ValuationReport {
            total_items: lines.len(),
            lines,
            total_quantity: round_quantity(total_quantity),
            total_value: round_money(total_value),
        })
    }

    /// Stocked items at or below their reorder point.
    ///
    /// Items with a zero reorder point are never reported.
    pub fn reorder_report(&self) -> InventoryResult<Vec<ValuationLine>> {
        Ok(self
            .store()
            .items()?
            .iter()
            .filter(|item| item.stock().is_some_and(|s| s.needs_reorder()))
            .filter_map(ValuationLine::from_item)
            .collect())
    }
}
