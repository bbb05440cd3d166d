//! Receipt lots.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costflow_core::{ItemId, LotId};

use crate::error::{InventoryError, InventoryResult, checked};

/// Free-form receipt details kept with a lot for audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotMetadata {
    pub lot_number: Option<String>,
    /// Source document (purchase order, build, count, ...).
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl LotMetadata {
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }
}

/// A lot staged for insertion; the store assigns its [`LotId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLot {
    pub item_id: ItemId,
    pub received_date: NaiveDate,
    pub quantity: Decimal,
    pub cost_per_unit: Decimal,
    pub metadata: LotMetadata,
}

impl NewLot {
    pub fn value(&self) -> InventoryResult<Decimal> {
        checked("lot value", self.quantity.checked_mul(self.cost_per_unit))
    }

    pub fn into_lot(self, id: LotId) -> InventoryLot {
        InventoryLot {
            id,
            item_id: self.item_id,
            received_date: self.received_date,
            original_quantity: self.quantity,
            cost_per_unit: self.cost_per_unit,
            remaining_quantity: self.quantity,
            metadata: self.metadata,
        }
    }
}

/// A receipt of stock at a fixed unit cost.
///
/// `remaining_quantity` only ever decreases and stays within
/// `0..=original_quantity`; lots are kept after they are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLot {
    id: LotId,
    item_id: ItemId,
    received_date: NaiveDate,
    original_quantity: Decimal,
    cost_per_unit: Decimal,
    remaining_quantity: Decimal,
    metadata: LotMetadata,
}

impl InventoryLot {
    pub fn id(&self) -> LotId {
        self.id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn received_date(&self) -> NaiveDate {
        self.received_date
    }

    pub fn original_quantity(&self) -> Decimal {
        self.original_quantity
    }

    pub fn cost_per_unit(&self) -> Decimal {
        self.cost_per_unit
    }

    pub fn remaining_quantity(&self) -> Decimal {
        self.remaining_quantity
    }

    pub fn metadata(&self) -> &LotMetadata {
        &self.metadata
    }

    pub fn remaining_value(&self) -> Decimal {
        self.remaining_quantity * self.cost_per_unit
    }

    pub fn is_open(&self) -> bool {
        self.remaining_quantity > Decimal::ZERO
    }

    /// Take up to `wanted` units from this lot, returning how many were taken.
    pub(crate) fn draw(&mut self, wanted: Decimal) -> Decimal {
        let taken = wanted.min(self.remaining_quantity).max(Decimal::ZERO);
        self.remaining_quantity -= taken;
        taken
    }

    /// Overwrite the remaining quantity with a committed value.
    ///
    /// Used by stores applying a lot update; rejects increases and negatives.
    pub fn set_remaining(&mut self, remaining: Decimal) -> InventoryResult<()> {
        if remaining < Decimal::ZERO || remaining > self.remaining_quantity {
            return Err(InventoryError::validation(format!(
                "lot {} remaining quantity may only decrease (from {} to {remaining})",
                self.id, self.remaining_quantity
            )));
        }
        self.remaining_quantity = remaining;
        Ok(())
    }
}
