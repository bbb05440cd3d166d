use chrono::{DateTime, Utc};

use costflow_core::ItemId;

/// A fact about committed inventory state.
///
/// Events are immutable, versioned and only ever produced after the change
/// they describe has been committed.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "inventory.lot.received").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the change was committed.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Items whose quantity or value changed.
    fn item_ids(&self) -> Vec<ItemId>;
}
