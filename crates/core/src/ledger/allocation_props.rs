//! Property-based tests for the payment waterfall.
//!
//! - Conservation: allocations plus overpayment equal the payment
//! - Priority: a lower rank is never short while a higher rank received funds

use proptest::prelude::*;
use rentbook_shared::types::LineItemId;
use rust_decimal::Decimal;

use super::allocation::{AllocationTarget, PaymentWaterfall, WaterfallResult};
use crate::invoice::LineItemCategory;

/// Strategy to generate positive decimal amounts (0.01 to 20,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..2_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a category with its standard rank.
fn ranked_category() -> impl Strategy<Value = (LineItemCategory, u8)> {
    prop_oneof![
        Just((LineItemCategory::Rent, 1)),
        Just((LineItemCategory::Utility, 2)),
        Just((LineItemCategory::Maintenance, 3)),
        Just((LineItemCategory::Taxes, 4)),
        Just((LineItemCategory::Deposit, 5)),
    ]
}

fn targets() -> impl Strategy<Value = Vec<AllocationTarget>> {
    prop::collection::vec((ranked_category(), positive_amount()), 0..8).prop_map(|items| {
        items
            .into_iter()
            .map(|((category, rank), outstanding)| AllocationTarget {
                line_item_id: Some(LineItemId::new()),
                category,
                ledger_category: category.as_str().to_string(),
                outstanding,
                rank,
            })
            .collect()
    })
}

fn allocated(result: &WaterfallResult, target: &AllocationTarget) -> Decimal {
    target
        .line_item_id
        .map_or(Decimal::ZERO, |id| result.allocated_to(id))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every cent of the payment is either allocated or overpaid.
    #[test]
    fn prop_payment_is_conserved(payment in positive_amount(), targets in targets()) {
        let owed: Decimal = targets.iter().map(|t| t.outstanding).sum();
        let result = PaymentWaterfall::allocate(payment, targets);

        prop_assert_eq!(result.total_allocated() + result.overpayment, payment);
        prop_assert_eq!(result.overpayment, (payment - owed).max(Decimal::ZERO));
    }

    /// No target receives more than it owes.
    #[test]
    fn prop_allocation_bounded_by_outstanding(payment in positive_amount(), targets in targets()) {
        let result = PaymentWaterfall::allocate(payment, targets.clone());
        for target in &targets {
            prop_assert!(allocated(&result, target) <= target.outstanding);
        }
    }

    /// If a target received anything, every strictly higher-priority target is fully paid.
    #[test]
    fn prop_higher_priority_paid_first(payment in positive_amount(), targets in targets()) {
        let result = PaymentWaterfall::allocate(payment, targets.clone());
        for lower in &targets {
            if allocated(&result, lower) > Decimal::ZERO {
                for higher in targets.iter().filter(|t| t.rank < lower.rank) {
                    prop_assert_eq!(allocated(&result, higher), higher.outstanding);
                }
            }
        }
    }
}
