//! Notifications published after inventory commits.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costflow_core::{AdjustmentId, CountId, ItemId, LotId};
use costflow_events::Event;

use crate::adjustment::AdjustmentSource;
use crate::item::ItemType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item_id: ItemId,
    pub item_type: ItemType,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotReceived {
    pub item_id: ItemId,
    pub lot_id: LotId,
    pub quantity: Decimal,
    pub cost_per_unit: Decimal,
    pub received_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockConsumed {
    pub item_id: ItemId,
    pub quantity: Decimal,
    /// Full precision.
    pub cogs: Decimal,
    pub date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAdjusted {
    pub adjustment_id: AdjustmentId,
    pub item_id: ItemId,
    pub quantity_change: Decimal,
    pub value_change: Decimal,
    pub source: AdjustmentSource,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyBuilt {
    pub assembly_item_id: ItemId,
    pub component_item_ids: Vec<ItemId>,
    pub quantity: Decimal,
    pub component_cost: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalCountStarted {
    pub count_id: CountId,
    pub line_count: usize,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalCountPosted {
    pub count_id: CountId,
    pub adjusted_item_ids: Vec<ItemId>,
    pub total_variance_value: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemCreated(ItemCreated),
    LotReceived(LotReceived),
    StockConsumed(StockConsumed),
    InventoryAdjusted(InventoryAdjusted),
    AssemblyBuilt(AssemblyBuilt),
    PhysicalCountStarted(PhysicalCountStarted),
    PhysicalCountPosted(PhysicalCountPosted),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemCreated(_) => "inventory.item.created",
            InventoryEvent::LotReceived(_) => "inventory.lot.received",
            InventoryEvent::StockConsumed(_) => "inventory.stock.consumed",
            InventoryEvent::InventoryAdjusted(_) => "inventory.item.adjusted",
            InventoryEvent::AssemblyBuilt(_) => "inventory.assembly.built",
            InventoryEvent::PhysicalCountStarted(_) => "inventory.count.started",
            InventoryEvent::PhysicalCountPosted(_) => "inventory.count.posted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemCreated(e) => e.occurred_at,
            InventoryEvent::LotReceived(e) => e.occurred_at,
            InventoryEvent::StockConsumed(e) => e.occurred_at,
            InventoryEvent::InventoryAdjusted(e) => e.occurred_at,
            InventoryEvent::AssemblyBuilt(e) => e.occurred_at,
            InventoryEvent::PhysicalCountStarted(e) => e.occurred_at,
            InventoryEvent::PhysicalCountPosted(e) => e.occurred_at,
        }
    }

    fn item_ids(&self) -> Vec<ItemId> {
        match self {
            InventoryEvent::ItemCreated(e) => vec![e.item_id],
            InventoryEvent::LotReceived(e) => vec![e.item_id],
            InventoryEvent::StockConsumed(e) => vec![e.item_id],
            InventoryEvent::InventoryAdjusted(e) => vec![e.item_id],
            InventoryEvent::AssemblyBuilt(e) => {
                let mut ids = e.component_item_ids.clone();
                ids.push(e.assembly_item_id);
                ids
            }
            InventoryEvent::PhysicalCountStarted(_) => vec![],
            InventoryEvent::PhysicalCountPosted(e) => e.adjusted_item_ids.clone(),
        }
    }
}
