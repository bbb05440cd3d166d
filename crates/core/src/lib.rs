//! `costflow-core` — shared building blocks for the valuation engine.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the generic error model, optimistic version checks and the
//! decimal rounding rules applied at the API boundary.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AdjustmentId, CountId, ItemId, LotId};
pub use money::{round_money, round_quantity, round_unit_cost};
