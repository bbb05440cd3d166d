//! Physical count sessions.
//!
//! A count moves `InProgress → Posted` exactly once. Lines snapshot the
//! expected quantity when the count starts; counted quantities can be
//! recorded (and overwritten) until the count is posted.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costflow_core::{AggregateRoot, CountId, ItemId};

use crate::error::{InventoryError, InventoryResult, ensure_non_negative};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    InProgress,
    Posted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalCountLine {
    pub item_id: ItemId,
    pub expected_quantity: Decimal,
    pub counted_quantity: Option<Decimal>,
    /// `counted - expected`, once counted.
    pub variance: Option<Decimal>,
    pub adjusted: bool,
}

impl PhysicalCountLine {
    /// Counted with a non-zero variance.
    pub fn needs_adjustment(&self) -> bool {
        matches!(self.variance, Some(v) if !v.is_zero())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalCount {
    id: CountId,
    count_date: NaiveDate,
    status: CountStatus,
    lines: Vec<PhysicalCountLine>,
    started_at: DateTime<Utc>,
    posted_at: Option<DateTime<Utc>>,
    version: u64,
}

impl PhysicalCount {
    /// Open a count with one line per `(item, quantity on hand)` snapshot.
    pub fn start(
        id: CountId,
        count_date: NaiveDate,
        snapshots: impl IntoIterator<Item = (ItemId, Decimal)>,
        started_at: DateTime<Utc>,
    ) -> InventoryResult<Self> {
        let mut lines: Vec<PhysicalCountLine> = snapshots
            .into_iter()
            .map(|(item_id, expected_quantity)| PhysicalCountLine {
                item_id,
                expected_quantity,
                counted_quantity: None,
                variance: None,
                adjusted: false,
            })
            .collect();
        lines.sort_by_key(|l| l.item_id);
        if lines.windows(2).any(|w| w[0].item_id == w[1].item_id) {
            return Err(InventoryError::validation(
                "an item may appear only once in a physical count",
            ));
        }

        Ok(Self {
            id,
            count_date,
            status: CountStatus::InProgress,
            lines,
            started_at,
            posted_at: None,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> CountId {
        self.id
    }

    pub fn count_date(&self) -> NaiveDate {
        self.count_date
    }

    pub fn status(&self) -> CountStatus {
        self.status
    }

    pub fn lines(&self) -> &[PhysicalCountLine] {
        &self.lines
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.posted_at
    }

    pub fn line(&self, item_id: ItemId) -> Option<&PhysicalCountLine> {
        self.lines.iter().find(|l| l.item_id == item_id)
    }

    /// Item ids in ascending order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.lines.iter().map(|l| l.item_id).collect()
    }

    pub fn ensure_in_progress(&self) -> InventoryResult<()> {
        match self.status {
            CountStatus::InProgress => Ok(()),
            CountStatus::Posted => Err(InventoryError::AlreadyPosted { count_id: self.id }),
        }
    }

    /// Record (or overwrite) the counted quantity for one item.
    pub fn record(&mut self, item_id: ItemId, counted_quantity: Decimal) -> InventoryResult<&PhysicalCountLine> {
        self.ensure_in_progress()?;
        ensure_non_negative("counted_quantity", counted_quantity)?;

        let count_id = self.id;
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.item_id == item_id)
            .ok_or_else(|| {
                InventoryError::not_found("physical count line", format!("{count_id}/{item_id}"))
            })?;
        line.counted_quantity = Some(counted_quantity);
        line.variance = Some(counted_quantity - line.expected_quantity);
        Ok(line)
    }

    /// Lines whose variance must be posted, in item id order.
    pub fn lines_to_post(&self) -> Vec<&PhysicalCountLine> {
        self.lines.iter().filter(|l| l.needs_adjustment()).collect()
    }

    /// Close the count. Every line is marked adjusted; callers must have
    /// applied the variances of [`Self::lines_to_post`] in the same commit.
    pub fn mark_posted(&mut self, posted_at: DateTime<Utc>) -> InventoryResult<()> {
        self.ensure_in_progress()?;
        for line in &mut self.lines {
            line.adjusted = true;
        }
        self.status = CountStatus::Posted;
        self.posted_at = Some(posted_at);
        Ok(())
    }

    /// Called by stores on commit.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl AggregateRoot for PhysicalCount {
    type Id = CountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn count_of(items: &[(ItemId, Decimal)]) -> PhysicalCount {
        PhysicalCount::start(
            CountId::new(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            items.iter().copied(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn recording_computes_variance_and_overwrites() {
        let item = ItemId::new();
        let mut count = count_of(&[(item, dec!(30))]);

        count.record(item, dec!(31)).unwrap();
        let line = count.record(item, dec!(28)).unwrap();
        assert_eq!(line.counted_quantity, Some(dec!(28)));
        assert_eq!(line.variance, Some(dec!(-2)));
        assert_eq!(count.lines_to_post().len(), 1);
    }

    #[test]
    fn zero_variance_and_uncounted_lines_are_not_posted() {
        let (a, b) = (ItemId::new(), ItemId::new());
        let mut count = count_of(&[(a, dec!(5)), (b, dec!(7))]);
        count.record(a, dec!(5)).unwrap();
        assert!(count.lines_to_post().is_empty());
    }

    #[test]
    fn posted_count_is_terminal() {
        let item = ItemId::new();
        let mut count = count_of(&[(item, dec!(1))]);
        count.record(item, dec!(0)).unwrap();
        count.mark_posted(Utc::now()).unwrap();

        assert_eq!(count.status(), CountStatus::Posted);
        assert!(count.lines().iter().all(|l| l.adjusted));
        assert!(matches!(
            count.record(item, dec!(3)),
            Err(InventoryError::AlreadyPosted { .. })
        ));
        assert!(matches!(
            count.mark_posted(Utc::now()),
            Err(InventoryError::AlreadyPosted { .. })
        ));
    }

    #[test]
    fn unknown_items_and_negative_counts_are_rejected() {
        let item = ItemId::new();
        let mut count = count_of(&[(item, dec!(1))]);
        assert!(matches!(
            count.record(ItemId::new(), dec!(1)),
            Err(InventoryError::NotFound { .. })
        ));
        assert!(matches!(
            count.record(item, dec!(-1)),
            Err(InventoryError::Validation(_))
        ));
    }

    #[test]
    fn duplicate_items_are_rejected_at_start() {
        let item = ItemId::new();
        let err = PhysicalCount::start(
            CountId::new(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            [(item, dec!(1)), (item, dec!(2))],
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }
}
