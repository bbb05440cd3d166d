//! Receipts, sales and manual adjustments.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costflow_core::{AdjustmentId, ItemId, LotId, round_money, round_quantity, round_unit_cost};
use costflow_events::EventBus;
use costflow_inventory::events::{InventoryAdjusted, LotReceived, StockConsumed};
use costflow_inventory::{
    AdjustmentSource, InventoryError, InventoryEvent, InventoryResult, LotDraw, LotMetadata,
    NewAdjustment,
};

use super::{InventoryEngine, now};
use crate::store::{ChangeSet, InventoryStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveOutcome {
    pub lot_id: LotId,
    pub new_quantity: Decimal,
    pub new_average_cost: Decimal,
    pub new_asset_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOutcome {
    pub cogs: Decimal,
    pub remaining_quantity: Decimal,
    pub remaining_value: Decimal,
    /// Lots drawn, in consumption order; empty for average-cost items.
    pub draws: Vec<LotDraw>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustOutcome {
    pub adjustment_id: AdjustmentId,
    pub old_quantity: Decimal,
    pub new_quantity: Decimal,
    pub old_value: Decimal,
    pub new_value: Decimal,
}

impl<S, B> InventoryEngine<S, B>
where
    S: InventoryStore,
    B: EventBus<InventoryEvent>,
{
    /// Record a receipt as a new lot and fold it into the item's value.
    pub fn receive_inventory(
        &self,
        item_id: ItemId,
        quantity: Decimal,
        cost_per_unit: Decimal,
        date: NaiveDate,
        metadata: LotMetadata,
    ) -> InventoryResult<ReceiveOutcome> {
        let _guard = self.lock([item_id])?;
        let mut ledger = self.load_ledger(item_id)?;
        let receipt = ledger.receive(quantity, cost_per_unit, date, metadata)?;

        let mut changes = ChangeSet::new();
        changes.stage_ledger(ledger);
        let committed = self.commit(changes)?;
        let lot_id = committed
            .lot_ids
            .first()
            .copied()
            .ok_or_else(|| InventoryError::validation("store assigned no lot id for receipt"))?;

        tracing::info!(
            %item_id,
            %lot_id,
            quantity = %quantity,
            cost_per_unit = %cost_per_unit,
            new_quantity = %receipt.new_quantity,
            "inventory received"
        );
        self.publish([InventoryEvent::LotReceived(LotReceived {
            item_id,
            lot_id,
            quantity,
            cost_per_unit,
            received_date: date,
            occurred_at: now(),
        })]);

        Ok(ReceiveOutcome {
            lot_id,
            new_quantity: round_quantity(receipt.new_quantity),
            new_average_cost: round_unit_cost(receipt.new_average_cost),
            new_asset_value: round_money(receipt.new_asset_value),
        })
    }

    /// Remove sold stock at cost according to the item's valuation method.
    pub fn sell_inventory(
        &self,
        item_id: ItemId,
        quantity: Decimal,
        date: NaiveDate,
    ) -> InventoryResult<SaleOutcome> {
        let _guard = self.lock([item_id])?;
        let mut ledger = self.load_ledger(item_id)?;
        let consumption = ledger.consume(quantity)?;
        let stock = ledger.stock()?;
        let (remaining_quantity, remaining_value) = (stock.quantity_on_hand, stock.asset_value);

        let mut changes = ChangeSet::new();
        changes.stage_ledger(ledger);
        self.commit(changes)?;

        tracing::info!(
            %item_id,
            quantity = %quantity,
            cogs = %round_money(consumption.cogs),
            lots = consumption.draws.len(),
            "inventory sold"
        );
        self.publish([InventoryEvent::StockConsumed(StockConsumed {
            item_id,
            quantity,
            cogs: consumption.cogs,
            date,
            occurred_at: now(),
        })]);

        Ok(SaleOutcome {
            cogs: round_money(consumption.cogs),
            remaining_quantity: round_quantity(remaining_quantity),
            remaining_value: round_money(remaining_value),
            draws: consumption.draws,
        })
    }

    /// Manually correct quantity and/or value, leaving an audit record.
    pub fn adjust_inventory(
        &self,
        item_id: ItemId,
        quantity_change: Option<Decimal>,
        value_change: Option<Decimal>,
        reason: &str,
    ) -> InventoryResult<AdjustOutcome> {
        if reason.trim().is_empty() {
            return Err(InventoryError::validation("adjustment reason cannot be empty"));
        }

        let _guard = self.lock([item_id])?;
        let mut ledger = self.load_ledger(item_id)?;
        let recorded_at = now();
        let effect = ledger.adjust(
            quantity_change,
            value_change,
            recorded_at.date_naive(),
            LotMetadata::reference(format!("adjustment: {reason}")),
        )?;
        let record = NewAdjustment::from_effect(
            item_id,
            &effect,
            reason.trim(),
            AdjustmentSource::Manual,
            recorded_at,
        );

        let mut changes = ChangeSet::new();
        changes.stage_ledger(ledger);
        changes.append_adjustment(record);
        let committed = self.commit(changes)?;
        let adjustment_id = committed
            .adjustment_ids
            .first()
            .copied()
            .ok_or_else(|| InventoryError::validation("store assigned no adjustment id"))?;

        tracing::info!(
            %item_id,
            %adjustment_id,
            quantity_change = %effect.quantity_change,
            value_change = %round_money(effect.value_change),
            reason,
            "inventory adjusted"
        );
        self.publish([InventoryEvent::InventoryAdjusted(InventoryAdjusted {
            adjustment_id,
            item_id,
            quantity_change: effect.quantity_change,
            value_change: effect.value_change,
            source: AdjustmentSource::Manual,
            occurred_at: recorded_at,
        })]);

        Ok(AdjustOutcome {
            adjustment_id,
            old_quantity: round_quantity(effect.old_quantity),
            new_quantity: round_quantity(effect.new_quantity),
            old_value: round_money(effect.old_value),
            new_value: round_money(effect.new_value),
        })
    }
}
