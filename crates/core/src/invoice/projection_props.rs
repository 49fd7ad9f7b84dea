//! Property-based tests for the payment projection.
//!
//! - Resync idempotence: projecting twice over the same ledger state is a no-op
//! - Cache invariants: balance and effective paid stay within the invoice total

use chrono::NaiveDate;
use proptest::prelude::*;
use rentbook_shared::types::{PropertyId, TenantId};
use rust_decimal::Decimal;

use super::line_item::{InvoiceLineItem, LineItemCategory};
use super::projection::PaymentProjection;
use super::types::{Invoice, InvoiceStatus};

/// Strategy to generate amounts (0.00 to 50,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..5_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a cached status.
fn status() -> impl Strategy<Value = InvoiceStatus> {
    prop_oneof![
        Just(InvoiceStatus::Issued),
        Just(InvoiceStatus::PartiallyPaid),
        Just(InvoiceStatus::Paid),
        Just(InvoiceStatus::Overdue),
    ]
}

fn make_invoice(total: Decimal, status: InvoiceStatus) -> Invoice {
    let mut invoice = Invoice::new(
        "PROP",
        TenantId::new(),
        PropertyId::new(),
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
    )
    .with_line_item(InvoiceLineItem::new(LineItemCategory::Rent, "Rent", total));
    invoice.status = status;
    invoice
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Applying a projection and projecting again yields the same values.
    #[test]
    fn prop_resync_is_idempotent(
        total in amount(),
        paid in amount(),
        cached in status(),
    ) {
        let mut invoice = make_invoice(total, cached);
        let first = PaymentProjection::derive(&invoice, paid, Decimal::ZERO, Decimal::ZERO);
        first.apply(&mut invoice);

        let second = PaymentProjection::derive(&invoice, paid, Decimal::ZERO, Decimal::ZERO);
        prop_assert!(second.matches(&invoice));
        prop_assert_eq!(first, second);
    }

    /// Applied credit settles exactly like the same amount of cash, except
    /// that it never counts towards `total_paid`.
    #[test]
    fn prop_credit_settles_like_cash(total in amount(), cash in amount(), credit in amount()) {
        let invoice = make_invoice(total, InvoiceStatus::Issued);
        let mixed = PaymentProjection::derive(&invoice, cash, credit, Decimal::ZERO);
        let cash_only = PaymentProjection::derive(
            &invoice,
            cash + credit,
            Decimal::ZERO,
            Decimal::ZERO,
        );

        prop_assert_eq!(mixed.total_paid, cash);
        prop_assert_eq!(mixed.effective_paid, cash_only.effective_paid);
        prop_assert_eq!(mixed.balance_amount, cash_only.balance_amount);
        prop_assert_eq!(mixed.status, cash_only.status);
    }

    /// effective_paid + balance == total, and overpaid only when paid > total.
    #[test]
    fn prop_cache_invariants(total in amount(), paid in amount()) {
        let invoice = make_invoice(total, InvoiceStatus::Issued);
        let projection = PaymentProjection::derive(&invoice, paid, Decimal::ZERO, Decimal::ZERO);

        prop_assert_eq!(projection.effective_paid + projection.balance_amount, invoice.total_amount);
        prop_assert!(projection.effective_paid <= invoice.total_amount);
        prop_assert_eq!(projection.overpaid_amount, (paid - total).max(Decimal::ZERO));
        prop_assert_eq!(
            projection.balance_amount,
            (invoice.total_amount - projection.effective_paid).max(Decimal::ZERO)
        );
    }
}
