//! Priority waterfall allocation of payments across line items.
//!
//! The waterfall fully satisfies the highest-priority obligation before any
//! lower-priority obligation receives funds. There is no proportional split.

use rentbook_shared::types::{LineItemId, round_money};
use rust_decimal::Decimal;

use crate::invoice::LineItemCategory;

/// An obligation competing for a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationTarget {
    /// Line item owed, `None` for invoice-level charges such as tax.
    pub line_item_id: Option<LineItemId>,
    /// Its category.
    pub category: LineItemCategory,
    /// Ledger category string for entries.
    pub ledger_category: String,
    /// Amount still owed on the item.
    pub outstanding: Decimal,
    /// Waterfall rank, lower is paid first.
    pub rank: u8,
}

/// Amount assigned to one line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Line item paid, `None` for invoice-level charges.
    pub line_item_id: Option<LineItemId>,
    /// Its category.
    pub category: LineItemCategory,
    /// Ledger category string for entries.
    pub ledger_category: String,
    /// Amount assigned (always positive).
    pub amount: Decimal,
}

/// Result of running the waterfall.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaterfallResult {
    /// Non-zero allocations in payment order.
    pub allocations: Vec<Allocation>,
    /// Payment left after every target was visited.
    pub overpayment: Decimal,
}

impl WaterfallResult {
    /// Amount allocated to a line item (zero if it received nothing).
    #[must_use]
    pub fn allocated_to(&self, line_item_id: LineItemId) -> Decimal {
        self.allocations
            .iter()
            .filter(|a| a.line_item_id == Some(line_item_id))
            .map(|a| a.amount)
            .sum()
    }

    /// Sum of all allocations.
    #[must_use]
    pub fn total_allocated(&self) -> Decimal {
        self.allocations.iter().map(|a| a.amount).sum()
    }
}

/// Stateless payment allocator.
pub struct PaymentWaterfall;

impl PaymentWaterfall {
    /// Allocates a payment across targets by ascending rank.
    ///
    /// Targets with equal rank keep their input order. Each target receives
    /// `min(remaining, outstanding)`; the walk stops once the payment is spent.
    /// Whatever remains after every target is the overpayment.
    ///
    /// # Example
    ///
    /// ```
    /// use rentbook_core::invoice::LineItemCategory;
    /// use rentbook_core::ledger::allocation::{AllocationTarget, PaymentWaterfall};
    /// use rentbook_shared::types::LineItemId;
    /// use rust_decimal_macros::dec;
    ///
    /// let rent = AllocationTarget {
    ///     line_item_id: Some(LineItemId::new()),
    ///     category: LineItemCategory::Rent,
    ///     ledger_category: "rent".to_string(),
    ///     outstanding: dec!(15000),
    ///     rank: 1,
    /// };
    /// let rent_id = rent.line_item_id.unwrap();
    /// let result = PaymentWaterfall::allocate(dec!(10000), vec![rent]);
    /// assert_eq!(result.allocated_to(rent_id), dec!(10000));
    /// assert_eq!(result.overpayment, dec!(0));
    /// ```
    #[must_use]
    pub fn allocate(payment: Decimal, mut targets: Vec<AllocationTarget>) -> WaterfallResult {
        targets.sort_by_key(|t| t.rank);

        let mut remaining = round_money(payment.max(Decimal::ZERO));
        let mut allocations = Vec::new();

        for target in targets {
            if remaining <= Decimal::ZERO {
                break;
            }
            let owed = round_money(target.outstanding.max(Decimal::ZERO));
            let amount = remaining.min(owed);
            if amount > Decimal::ZERO {
                remaining -= amount;
                allocations.push(Allocation {
                    line_item_id: target.line_item_id,
                    category: target.category,
                    ledger_category: target.ledger_category,
                    amount,
                });
            }
        }

        WaterfallResult {
            allocations,
            overpayment: remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn target(category: LineItemCategory, outstanding: Decimal, rank: u8) -> AllocationTarget {
        AllocationTarget {
            line_item_id: Some(LineItemId::new()),
            category,
            ledger_category: category.as_str().to_string(),
            outstanding,
            rank,
        }
    }

    fn id(target: &AllocationTarget) -> LineItemId {
        target.line_item_id.unwrap()
    }

    #[test]
    fn test_invoice_level_target_is_allocated() {
        let rent = target(LineItemCategory::Rent, dec!(100), 1);
        let tax = AllocationTarget {
            line_item_id: None,
            category: LineItemCategory::Taxes,
            ledger_category: "taxes".to_string(),
            outstanding: dec!(8),
            rank: 4,
        };

        let result = PaymentWaterfall::allocate(dec!(105), vec![tax, rent]);

        assert_eq!(result.allocations.len(), 2);
        assert_eq!(result.allocations[1].line_item_id, None);
        assert_eq!(result.allocations[1].amount, dec!(5));
    }

    #[test]
    fn test_rent_before_utility() {
        let utility = target(LineItemCategory::Utility, dec!(2000), 2);
        let rent = target(LineItemCategory::Rent, dec!(15000), 1);

        let result = PaymentWaterfall::allocate(dec!(10000), vec![utility.clone(), rent.clone()]);

        assert_eq!(result.allocated_to(id(&rent)), dec!(10000));
        assert_eq!(result.allocated_to(id(&utility)), Decimal::ZERO);
        assert_eq!(result.allocations.len(), 1);
        assert_eq!(result.overpayment, Decimal::ZERO);
    }

    #[test]
    fn test_spills_into_next_rank() {
        let rent = target(LineItemCategory::Rent, dec!(1000), 1);
        let water = target(LineItemCategory::Utility, dec!(80), 2);
        let deposit = target(LineItemCategory::Deposit, dec!(500), 5);

        let result = PaymentWaterfall::allocate(
            dec!(1050),
            vec![deposit.clone(), water.clone(), rent.clone()],
        );

        assert_eq!(result.allocated_to(id(&rent)), dec!(1000));
        assert_eq!(result.allocated_to(id(&water)), dec!(50));
        assert_eq!(result.allocated_to(id(&deposit)), Decimal::ZERO);
        assert_eq!(result.total_allocated(), dec!(1050));
    }

    #[test]
    fn test_overpayment_after_all_targets() {
        let rent = target(LineItemCategory::Rent, dec!(10000), 1);
        let result = PaymentWaterfall::allocate(dec!(12000), vec![rent]);
        assert_eq!(result.total_allocated(), dec!(10000));
        assert_eq!(result.overpayment, dec!(2000));
    }

    #[test]
    fn test_no_targets_is_all_overpayment() {
        let result = PaymentWaterfall::allocate(dec!(300), vec![]);
        assert!(result.allocations.is_empty());
        assert_eq!(result.overpayment, dec!(300));
    }

    #[test]
    fn test_equal_rank_keeps_input_order() {
        let maintenance = target(LineItemCategory::Maintenance, dec!(100), 3);
        let misc = target(LineItemCategory::Misc, dec!(100), 3);

        let result = PaymentWaterfall::allocate(dec!(150), vec![maintenance.clone(), misc.clone()]);

        assert_eq!(result.allocated_to(id(&maintenance)), dec!(100));
        assert_eq!(result.allocated_to(id(&misc)), dec!(50));
    }

    #[test]
    fn test_settled_targets_are_skipped() {
        let rent = target(LineItemCategory::Rent, Decimal::ZERO, 1);
        let water = target(LineItemCategory::Utility, dec!(40), 2);

        let result = PaymentWaterfall::allocate(dec!(40), vec![rent.clone(), water.clone()]);

        assert_eq!(result.allocated_to(id(&rent)), Decimal::ZERO);
        assert_eq!(result.allocated_to(id(&water)), dec!(40));
    }
}
