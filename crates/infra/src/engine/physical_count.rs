//! Physical count reconciliation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costflow_core::{CountId, ItemId, round_money};
use costflow_events::EventBus;
use costflow_inventory::events::{InventoryAdjusted, PhysicalCountPosted, PhysicalCountStarted};
use costflow_inventory::{
    AdjustmentSource, InventoryError, InventoryEvent, InventoryResult, LotMetadata, NewAdjustment,
    PhysicalCount, PhysicalCountLine,
};

use super::{InventoryEngine, now};
use crate::store::{ChangeSet, InventoryStore};

const VARIANCE_REASON: &str = "physical count variance";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedCount {
    pub count_id: CountId,
    pub lines: Vec<PhysicalCountLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOutcome {
    pub adjustments_made: usize,
    pub total_variance_value: Decimal,
}

impl<S, B> InventoryEngine<S, B>
where
    S: InventoryStore,
    B: EventBus<InventoryEvent>,
{
    /// Open a count, snapshotting the quantity on hand of each selected item.
    ///
    /// Without a filter every stocked item is included.
    pub fn start_physical_count(
        &self,
        count_date: NaiveDate,
        item_ids: Option<Vec<ItemId>>,
    ) -> InventoryResult<StartedCount> {
        let items = match item_ids {
            Some(ids) => {
                let mut selected = Vec::with_capacity(ids.len());
                for id in ids {
                    let item = self.load_item(id)?;
                    item.require_stock()?;
                    selected.push(item);
                }
                selected
            }
            None => self
                .store
                .items()?
                .into_iter()
                .filter(|i| i.stock().is_some())
                .collect(),
        };

        let snapshots = items
            .iter()
            .filter_map(|i| i.stock().map(|s| (i.id_typed(), s.quantity_on_hand)));
        let count = PhysicalCount::start(CountId::new(), count_date, snapshots, now())?;
        let count_id = count.id_typed();
        let lines = count.lines().to_vec();

        let mut changes = ChangeSet::new();
        changes.insert_count(count);
        self.commit(changes)?;

        tracing::info!(%count_id, lines = lines.len(), "physical count started");
        self.publish([InventoryEvent::PhysicalCountStarted(PhysicalCountStarted {
            count_id,
            line_count: lines.len(),
            occurred_at: now(),
        })]);

        Ok(StartedCount { count_id, lines })
    }

    /// Record the counted quantity of one item; re-recording overwrites.
    pub fn record_count(
        &self,
        count_id: CountId,
        item_id: ItemId,
        counted_quantity: Decimal,
    ) -> InventoryResult<PhysicalCountLine> {
        let mut count = self.load_count(count_id)?;
        let line = count.record(item_id, counted_quantity)?.clone();

        let mut changes = ChangeSet::new();
        changes.update_count(count);
        self.commit(changes)?;

        tracing::debug!(%count_id, %item_id, counted = %counted_quantity, "count recorded");
        Ok(line)
    }

    /// Apply every non-zero variance as an adjustment and close the count.
    ///
    /// All adjustments and the status change commit as one batch; if any of
    /// them fails the count stays in progress and nothing is written.
    pub fn post_physical_count(&self, count_id: CountId) -> InventoryResult<PostOutcome> {
        let pending = self.load_count(count_id)?;
        pending.ensure_in_progress()?;
        let _guard = self.lock(pending.item_ids())?;

        // Re-read under the locks: another caller may have posted meanwhile.
        let mut count = self.load_count(count_id)?;
        count.ensure_in_progress()?;

        let recorded_at = now();
        let mut ledgers = BTreeMap::new();
        let mut adjustments = Vec::new();
        let mut total_variance_value = Decimal::ZERO;

        for line in count.lines_to_post() {
            let Some(variance) = line.variance else { continue };
            let mut ledger = self.load_ledger(line.item_id)?;
            let effect = ledger.adjust(
                Some(variance),
                None,
                count.count_date(),
                LotMetadata::reference(format!("physical count {count_id}")),
            )?;
            total_variance_value += effect.value_change;
            adjustments.push(NewAdjustment::from_effect(
                line.item_id,
                &effect,
                VARIANCE_REASON,
                AdjustmentSource::PhysicalCount(count_id),
                recorded_at,
            ));
            ledgers.insert(line.item_id, ledger);
        }
        count.mark_posted(recorded_at)?;

        let mut changes = ChangeSet::new();
        for ledger in ledgers.into_values() {
            changes.stage_ledger(ledger);
        }
        for adjustment in &adjustments {
            changes.append_adjustment(adjustment.clone());
        }
        changes.update_count(count);
        let committed = self.commit(changes)?;

        let adjusted_item_ids: Vec<ItemId> = adjustments.iter().map(|a| a.item_id).collect();
        tracing::info!(
            %count_id,
            adjustments = adjustments.len(),
            total_variance_value = %round_money(total_variance_value),
            "physical count posted"
        );
        let adjusted_events = adjustments
            .iter()
            .zip(committed.adjustment_ids.iter())
            .map(|(a, id)| {
                InventoryEvent::InventoryAdjusted(InventoryAdjusted {
                    adjustment_id: *id,
                    item_id: a.item_id,
                    quantity_change: a.quantity_change,
                    value_change: a.value_change,
                    source: a.source,
                    occurred_at: recorded_at,
                })
            })
            .collect::<Vec<_>>();
        self.publish(adjusted_events);
        self.publish([InventoryEvent::PhysicalCountPosted(PhysicalCountPosted {
            count_id,
            adjusted_item_ids,
            total_variance_value,
            occurred_at: recorded_at,
        })]);

        Ok(PostOutcome {
            adjustments_made: adjustments.len(),
            total_variance_value: round_money(total_variance_value),
        })
    }

    pub fn get_physical_count(&self, count_id: CountId) -> InventoryResult<PhysicalCount> {
        self.load_count(count_id)
    }

    fn load_count(&self, count_id: CountId) -> InventoryResult<PhysicalCount> {
        self.store
            .physical_count(count_id)?
            .ok_or_else(|| InventoryError::not_found("physical count", count_id))
    }
}
