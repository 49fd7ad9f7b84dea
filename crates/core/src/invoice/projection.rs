//! Payment status projection.
//!
//! Derives an invoice's payment cache from ledger aggregates. Pure function of
//! its inputs, so applying it twice with the same ledger state is a no-op.

use rentbook_shared::types::round_money;
use rust_decimal::Decimal;

use super::types::{Invoice, InvoiceStatus};

/// Payment fields derived from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentProjection {
    /// Sum of cash debits against the invoice.
    pub total_paid: Decimal,
    /// `min(total_paid + credit applied, total_amount)`.
    pub effective_paid: Decimal,
    /// `max(0, total_paid + credit applied - total_amount)`.
    pub overpaid_amount: Decimal,
    /// `max(0, total_amount - effective_paid)`.
    pub balance_amount: Decimal,
    /// Derived status.
    pub status: InvoiceStatus,
    /// Overpayment not yet captured as tenant credit.
    pub uncaptured_overpayment: Decimal,
}

impl PaymentProjection {
    /// Projects payment fields for an invoice.
    ///
    /// * `cash_paid` - sum of cash debits referencing the invoice
    /// * `credit_applied` - tenant credit consumed against the invoice
    /// * `captured_overpayment` - net tenant credit already posted for the invoice
    ///
    /// Cash and applied credit both settle the invoice; only cash counts as
    /// `total_paid`. Nothing settled leaves the status alone, except that a
    /// cached payment-derived status falls back to `issued`. Cancelled and
    /// finalized invoices keep their status.
    #[must_use]
    pub fn derive(
        invoice: &Invoice,
        cash_paid: Decimal,
        credit_applied: Decimal,
        captured_overpayment: Decimal,
    ) -> Self {
        let total = invoice.total_amount;
        let total_paid = round_money(cash_paid);
        let settled = total_paid + round_money(credit_applied);
        let effective_paid = settled.min(total).max(Decimal::ZERO);
        let overpaid_amount = (settled - total).max(Decimal::ZERO);
        let balance_amount = (total - effective_paid).max(Decimal::ZERO);

        let status = if matches!(
            invoice.status,
            InvoiceStatus::Cancelled | InvoiceStatus::Finalized
        ) {
            invoice.status
        } else if settled > Decimal::ZERO {
            if settled >= total {
                InvoiceStatus::Paid
            } else {
                InvoiceStatus::PartiallyPaid
            }
        } else if invoice.status.is_payment_derived() {
            InvoiceStatus::Issued
        } else {
            invoice.status
        };

        Self {
            total_paid,
            effective_paid,
            overpaid_amount,
            balance_amount,
            status,
            uncaptured_overpayment: (overpaid_amount - captured_overpayment).max(Decimal::ZERO),
        }
    }

    /// Returns true if the invoice cache already holds these values.
    #[must_use]
    pub fn matches(&self, invoice: &Invoice) -> bool {
        invoice.total_paid == self.total_paid
            && invoice.effective_paid == self.effective_paid
            && invoice.overpaid_amount == self.overpaid_amount
            && invoice.balance_amount == self.balance_amount
            && invoice.status == self.status
    }

    /// Writes these values into the invoice cache.
    pub fn apply(&self, invoice: &mut Invoice) {
        invoice.total_paid = self.total_paid;
        invoice.effective_paid = self.effective_paid;
        invoice.overpaid_amount = self.overpaid_amount;
        invoice.balance_amount = self.balance_amount;
        invoice.status = self.status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::line_item::{InvoiceLineItem, LineItemCategory};
    use chrono::NaiveDate;
    use rentbook_shared::types::{PropertyId, TenantId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn invoice_with_total(total: Decimal, status: InvoiceStatus) -> Invoice {
        let mut invoice = Invoice::new(
            "P-1",
            TenantId::new(),
            PropertyId::new(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        )
        .with_line_item(InvoiceLineItem::new(LineItemCategory::Rent, "Rent", total));
        invoice.status = status;
        invoice
    }

    #[rstest]
    #[case(dec!(10000), InvoiceStatus::Paid, dec!(0), dec!(0))]
    #[case(dec!(4000), InvoiceStatus::PartiallyPaid, dec!(6000), dec!(0))]
    #[case(dec!(12000), InvoiceStatus::Paid, dec!(0), dec!(2000))]
    fn test_derive_payment_fields(
        #[case] paid: Decimal,
        #[case] status: InvoiceStatus,
        #[case] balance: Decimal,
        #[case] overpaid: Decimal,
    ) {
        let invoice = invoice_with_total(dec!(10000), InvoiceStatus::Issued);
        let projection = PaymentProjection::derive(&invoice, paid, Decimal::ZERO, Decimal::ZERO);

        assert_eq!(projection.status, status);
        assert_eq!(projection.balance_amount, balance);
        assert_eq!(projection.overpaid_amount, overpaid);
        assert_eq!(projection.effective_paid, paid.min(dec!(10000)));
    }

    #[test]
    fn test_unpaid_keeps_lifecycle_status() {
        let invoice = invoice_with_total(dec!(500), InvoiceStatus::Overdue);
        let projection = PaymentProjection::derive(
            &invoice,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert_eq!(projection.status, InvoiceStatus::Overdue);
        assert_eq!(projection.balance_amount, dec!(500));
    }

    #[test]
    fn test_unpaid_reverts_payment_status() {
        let invoice = invoice_with_total(dec!(500), InvoiceStatus::PartiallyPaid);
        let projection = PaymentProjection::derive(
            &invoice,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert_eq!(projection.status, InvoiceStatus::Issued);
    }

    #[test]
    fn test_closed_status_is_kept() {
        let invoice = invoice_with_total(dec!(500), InvoiceStatus::Finalized);
        let projection = PaymentProjection::derive(
            &invoice,
            dec!(200),
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert_eq!(projection.status, InvoiceStatus::Finalized);
        assert_eq!(projection.balance_amount, dec!(300));
    }

    #[test]
    fn test_captured_overpayment_is_not_recaptured() {
        let invoice = invoice_with_total(dec!(10000), InvoiceStatus::Issued);
        let projection = PaymentProjection::derive(
            &invoice,
            dec!(12000),
            Decimal::ZERO,
            dec!(2000),
        );
        assert_eq!(projection.overpaid_amount, dec!(2000));
        assert_eq!(projection.uncaptured_overpayment, Decimal::ZERO);

        let projection = PaymentProjection::derive(&invoice, dec!(12000), Decimal::ZERO, dec!(500));
        assert_eq!(projection.uncaptured_overpayment, dec!(1500));
    }

    #[test]
    fn test_applied_credit_settles_without_counting_as_cash() {
        let invoice = invoice_with_total(dec!(10000), InvoiceStatus::Issued);

        let projection = PaymentProjection::derive(
            &invoice,
            Decimal::ZERO,
            dec!(2000),
            Decimal::ZERO,
        );
        assert_eq!(projection.total_paid, Decimal::ZERO);
        assert_eq!(projection.effective_paid, dec!(2000));
        assert_eq!(projection.balance_amount, dec!(8000));
        assert_eq!(projection.status, InvoiceStatus::PartiallyPaid);

        let projection = PaymentProjection::derive(&invoice, dec!(8000), dec!(2000), Decimal::ZERO);
        assert_eq!(projection.total_paid, dec!(8000));
        assert_eq!(projection.balance_amount, Decimal::ZERO);
        assert_eq!(projection.overpaid_amount, Decimal::ZERO);
        assert_eq!(projection.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_apply_then_matches() {
        let mut invoice = invoice_with_total(dec!(800), InvoiceStatus::Issued);
        let projection = PaymentProjection::derive(
            &invoice,
            dec!(300),
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert!(!projection.matches(&invoice));

        projection.apply(&mut invoice);
        assert!(projection.matches(&invoice));
        assert_eq!(
            PaymentProjection::derive(&invoice, dec!(300), Decimal::ZERO, Decimal::ZERO),
            projection
        );
    }
}
