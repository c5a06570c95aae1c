//! Exact decimal money arithmetic
//!
//! All monetary values in the ledger are `rust_decimal::Decimal`. This module
//! centralizes the two rounding scales the bank uses (2 fractional digits for
//! currency amounts, 4 for rates) and the HALF_UP rounding applied whenever a
//! computed value is written back to a balance or a payment schedule.
//!
//! Comparisons are always exact `Decimal` comparisons; no epsilon, no floats.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits for currency amounts
pub const MONEY_DP: u32 = 2;

/// Fractional digits for interest and exchange rates
pub const RATE_DP: u32 = 4;

/// Round a currency amount to 2 decimal places, HALF_UP
///
/// HALF_UP maps to `MidpointAwayFromZero`: 0.005 rounds to 0.01 and
/// -0.005 rounds to -0.01.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a rate to 4 decimal places, HALF_UP
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute `(1 + rate)^periods` with checked arithmetic
///
/// Used by loan amortization. Loan terms are capped at 360 months, so a
/// plain multiplication loop stays exact and cheap; no float exponentiation
/// is involved at any point.
///
/// # Returns
///
/// * `Some(factor)` on success
/// * `None` if an intermediate product overflows `Decimal`
pub fn compound(rate: Decimal, periods: u32) -> Option<Decimal> {
    let base = Decimal::ONE.checked_add(rate)?;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor.checked_mul(base)?;
    }
    Some(factor)
}
