//! Rounding rules for values leaving the engine.
//!
//! State is always kept at full `Decimal` precision; these helpers are applied
//! only when building operation results and reports.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places for monetary amounts (asset value, COGS).
pub const MONEY_SCALE: u32 = 2;

/// Decimal places for per-unit costs.
pub const UNIT_COST_SCALE: u32 = 4;

/// Decimal places for quantities.
pub const QUANTITY_SCALE: u32 = 4;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_unit_cost(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(UNIT_COST_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_quantity(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
        assert_eq!(round_money(dec!(279.9999999)), dec!(280.00));
    }

    #[test]
    fn unit_cost_keeps_four_places() {
        let avg = dec!(350) / dec!(150);
        assert_eq!(round_unit_cost(avg), dec!(2.3333));
    }
}
