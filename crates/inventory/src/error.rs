//! Inventory error taxonomy.

use rust_decimal::Decimal;
use thiserror::Error;

use costflow_core::{CountId, DomainError, ItemId};

use crate::item::ItemType;

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Failure of an inventory operation.
///
/// Every variant carries the identifiers of the offending records. Only
/// [`InventoryError::ConcurrentModification`] is retryable; all other kinds
/// require the caller to change the request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("operation not valid for {item_type:?} item {item_id}")]
    InvalidItemType { item_id: ItemId, item_type: ItemType },

    #[error(
        "insufficient inventory for item {item_id}: requested {requested}, available {available} (short {shortfall})"
    )]
    InsufficientInventory {
        item_id: ItemId,
        requested: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    /// Lock wait timed out or a stale snapshot was detected at commit.
    #[error("concurrent modification of items {item_ids:?}; retry the operation")]
    ConcurrentModification { item_ids: Vec<ItemId> },

    #[error("physical count {count_id} is already posted")]
    AlreadyPosted { count_id: CountId },
}

impl InventoryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn item_not_found(item_id: ItemId) -> Self {
        Self::not_found("item", item_id)
    }

    pub fn insufficient(item_id: ItemId, requested: Decimal, available: Decimal) -> Self {
        Self::InsufficientInventory {
            item_id,
            requested,
            available,
            shortfall: requested - available,
        }
    }

    /// Quantity missing to satisfy the request, for `InsufficientInventory`.
    pub fn shortfall(&self) -> Option<Decimal> {
        match self {
            InventoryError::InsufficientInventory { shortfall, .. } => Some(*shortfall),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, InventoryError::ConcurrentModification { .. })
    }
}

impl From<DomainError> for InventoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => InventoryError::Validation(msg),
            DomainError::InvalidId(msg) => InventoryError::Validation(msg),
            DomainError::NotFound { entity, id } => InventoryError::NotFound { entity, id },
            DomainError::Conflict(_) => InventoryError::ConcurrentModification { item_ids: vec![] },
        }
    }
}

/// Reject zero/negative quantities.
pub(crate) fn ensure_positive(what: &str, value: Decimal) -> InventoryResult<()> {
    if value <= Decimal::ZERO {
        return Err(InventoryError::validation(format!(
            "{what} must be positive (got {value})"
        )));
    }
    Ok(())
}

/// Turn an overflowed checked operation into a validation error.
pub(crate) fn checked(what: &str, value: Option<Decimal>) -> InventoryResult<Decimal> {
    value.ok_or_else(|| InventoryError::validation(format!("{what} overflows")))
}

/// Reject negative values (zero allowed).
pub(crate) fn ensure_non_negative(what: &str, value: Decimal) -> InventoryResult<()> {
    if value < Decimal::ZERO {
        return Err(InventoryError::validation(format!(
            "{what} cannot be negative (got {value})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn shortfall_is_requested_minus_available() {
        let err = InventoryError::insufficient(ItemId::new(), dec!(12), dec!(5));
        assert_eq!(err.shortfall(), Some(dec!(7)));
        assert!(err.to_string().contains("short 7"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn only_concurrent_modification_is_retryable() {
        let err = InventoryError::ConcurrentModification { item_ids: vec![] };
        assert!(err.is_retryable());
        assert!(!InventoryError::validation("x").is_retryable());
    }

    #[test]
    fn domain_conflicts_become_concurrent_modification() {
        let err: InventoryError = DomainError::conflict("stale").into();
        assert!(err.is_retryable());
    }
}
