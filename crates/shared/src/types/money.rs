//! Money rounding helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount that reaches the ledger passes through [`round_money`].

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept on every ledger amount.
pub const MONEY_DP: u32 = 2;

/// Rounds an amount to [`MONEY_DP`] places using Banker's Rounding.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    round_money_dp(amount, MONEY_DP)
}

/// Rounds an amount to `dp` places using Banker's Rounding.
#[must_use]
fn round_money_dp(amount: Decimal, dp: u32) -> Decimal {
    amount.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
}
