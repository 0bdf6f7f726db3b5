//! Decimal helpers shared by the split and settlement engines.
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::{LedgerError, LedgerResult};

/// Minor-unit digits used when no precision is configured (cents).
pub const DEFAULT_PRECISION: u32 = 2;

/// Allowed distance of a percentage total from 100 (1e-6 relative).
pub const PERCENT_TOLERANCE: Decimal = dec!(0.0001);

pub const HUNDRED: Decimal = dec!(100);

/// Largest accepted event amount. Keeps every sum and product of amounts far
/// below `Decimal::MAX`.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000000);

/// Cuts `value` down to `precision` fractional digits, rounding toward zero.
pub fn truncate(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, RoundingStrategy::ToZero)
}

/// Whether `value` is zero once expressed in whole minor units.
pub fn is_negligible(value: Decimal, precision: u32) -> bool {
    value
        .round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
        .is_zero()
}

/// Rejects non-positive amounts and amounts finer than the currency allows.
pub fn ensure_amount(amount: Decimal, precision: u32) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidSplitInput(format!(
            "amount must be > 0, got {amount}"
        )));
    }
    ensure_share(amount, precision)
}

/// Checks a single owed value: non-negative, bounded, and expressible in
/// whole minor units.
pub fn ensure_share(amount: Decimal, precision: u32) -> LedgerResult<()> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::InvalidSplitInput(format!(
            "amount must not be negative, got {amount}"
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(LedgerError::InvalidSplitInput(format!(
            "amount {amount} exceeds {MAX_AMOUNT}"
        )));
    }
    if amount.normalize().scale() > precision {
        return Err(LedgerError::InvalidSplitInput(format!(
            "amount {amount} has more than {precision} decimals"
        )));
    }
    Ok(())
}
