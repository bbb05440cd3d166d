//! Versioned records and optimistic concurrency expectations.

use crate::error::{DomainError, DomainResult};

/// A record with identity and a monotonically increasing version.
///
/// Items and physical counts implement this so the store can reject a commit
/// built from a snapshot that another writer has since replaced.
pub trait AggregateRoot {
    /// Strongly-typed identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the identifier.
    fn id(&self) -> &Self::Id;

    /// Version of the committed state this value was read from.
    ///
    /// Bumped by exactly one on every successful commit that rewrites the record.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for a record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The record must not exist yet.
    New,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Check against the stored version (`None` when the record is absent).
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::New, None) => true,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_only_matches_absent_records() {
        assert!(ExpectedVersion::New.matches(None));
        assert!(!ExpectedVersion::New.matches(Some(0)));
    }

    #[test]
    fn exact_rejects_stale_versions() {
        assert!(ExpectedVersion::Exact(3).check(Some(3)).is_ok());
        let err = ExpectedVersion::Exact(3).check(Some(4)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(ExpectedVersion::Exact(3).check(None).is_err());
    }
}
