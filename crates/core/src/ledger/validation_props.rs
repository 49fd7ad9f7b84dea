//! Property-based tests for batch balance validation.
//!
//! - Balanced batches are accepted with matching totals
//! - Any imbalance is rejected
//! - Negative or two-sided entries are rejected

use chrono::Utc;
use proptest::prelude::*;
use rentbook_shared::types::LedgerEntryId;
use rust_decimal::Decimal;

use super::entry::{AccountType, LedgerEntry, TransactionType};
use super::error::LedgerError;
use super::validation::validate_balance;

/// Strategy to generate a valid positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Helper to create a ledger entry for testing.
fn make_entry(debit: Decimal, credit: Decimal) -> LedgerEntry {
    LedgerEntry {
        id: LedgerEntryId::new(),
        date: Utc::now(),
        account: "Test".to_string(),
        account_code: "9999".to_string(),
        account_type: AccountType::Asset,
        debit,
        credit,
        category: "misc".to_string(),
        invoice_id: None,
        line_item_id: None,
        property_id: None,
        tenant_id: None,
        transaction_type: TransactionType::Adjustment,
        reference: "PROP".to_string(),
    }
}

/// Splits every debit into one debit entry and a matching credit entry.
fn balanced_batch(amounts: &[Decimal]) -> Vec<LedgerEntry> {
    amounts
        .iter()
        .flat_map(|&a| [make_entry(a, Decimal::ZERO), make_entry(Decimal::ZERO, a)])
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Balanced batches pass and report their totals.
    #[test]
    fn prop_balanced_batch_accepted(amounts in prop::collection::vec(positive_amount(), 1..10)) {
        let entries = balanced_batch(&amounts);
        let expected: Decimal = amounts.iter().copied().sum();

        let totals = validate_balance(&entries).unwrap();
        prop_assert_eq!(totals.debit, expected);
        prop_assert_eq!(totals.credit, expected);
    }

    /// Adding a single stray leg always breaks the balance.
    #[test]
    fn prop_stray_leg_rejected(
        amounts in prop::collection::vec(positive_amount(), 0..10),
        stray in positive_amount(),
        as_debit in any::<bool>(),
    ) {
        let mut entries = balanced_batch(&amounts);
        entries.push(if as_debit {
            make_entry(stray, Decimal::ZERO)
        } else {
            make_entry(Decimal::ZERO, stray)
        });

        let result = validate_balance(&entries);
        prop_assert!(matches!(result, Err(LedgerError::Imbalance { .. })), "expected Imbalance error, got {:?}", result);
    }

    /// Negative amounts are rejected before totals are compared.
    #[test]
    fn prop_negative_amount_rejected(amount in positive_amount()) {
        let entries = vec![make_entry(-amount, Decimal::ZERO), make_entry(-amount, Decimal::ZERO)];
        let result = validate_balance(&entries);
        prop_assert!(matches!(result, Err(LedgerError::InvalidArgument(_))));
    }

    /// An entry with both sides set is rejected even if the batch balances.
    #[test]
    fn prop_two_sided_entry_rejected(amount in positive_amount()) {
        let entries = vec![make_entry(amount, amount)];
        let result = validate_balance(&entries);
        prop_assert!(matches!(result, Err(LedgerError::InvalidArgument(_))));
    }
}
