//! Append-only adjustment ledger records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costflow_core::{AdjustmentId, CountId, ItemId};

use crate::costing::AdjustmentEffect;

/// What produced an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count_id", rename_all = "snake_case")]
pub enum AdjustmentSource {
    Manual,
    PhysicalCount(CountId),
}

/// An adjustment staged for insertion; the store assigns its [`AdjustmentId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdjustment {
    pub item_id: ItemId,
    pub quantity_change: Decimal,
    pub value_change: Decimal,
    pub old_quantity: Decimal,
    pub new_quantity: Decimal,
    pub old_value: Decimal,
    pub new_value: Decimal,
    pub reason: String,
    pub source: AdjustmentSource,
    pub recorded_at: DateTime<Utc>,
}

impl NewAdjustment {
    pub fn from_effect(
        item_id: ItemId,
        effect: &AdjustmentEffect,
        reason: impl Into<String>,
        source: AdjustmentSource,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id,
            quantity_change: effect.quantity_change,
            value_change: effect.value_change,
            old_quantity: effect.old_quantity,
            new_quantity: effect.new_quantity,
            old_value: effect.old_value,
            new_value: effect.new_value,
            reason: reason.into(),
            source,
            recorded_at,
        }
    }

    pub fn into_record(self, id: AdjustmentId) -> InventoryAdjustment {
        InventoryAdjustment { id, entry: self }
    }
}

/// A committed adjustment. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAdjustment {
    id: AdjustmentId,
    #[serde(flatten)]
    entry: NewAdjustment,
}

impl InventoryAdjustment {
    pub fn id(&self) -> AdjustmentId {
        self.id
    }

    pub fn item_id(&self) -> ItemId {
        self.entry.item_id
    }

    pub fn quantity_change(&self) -> Decimal {
        self.entry.quantity_change
    }

    pub fn value_change(&self) -> Decimal {
        self.entry.value_change
    }

    pub fn old_quantity(&self) -> Decimal {
        self.entry.old_quantity
    }

    pub fn new_quantity(&self) -> Decimal {
        self.entry.new_quantity
    }

    pub fn old_value(&self) -> Decimal {
        self.entry.old_value
    }

    pub fn new_value(&self) -> Decimal {
        self.entry.new_value
    }

    pub fn reason(&self) -> &str {
        &self.entry.reason
    }

    pub fn source(&self) -> AdjustmentSource {
        self.entry.source
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.entry.recorded_at
    }
}
