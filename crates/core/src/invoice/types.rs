//! Invoice document types.
//!
//! The invoice is a cache of ledger-derived payment totals. Only the ledger
//! engine writes `status`, `total_paid`, `effective_paid`, `overpaid_amount`
//! and `balance_amount`.

use chrono::{DateTime, NaiveDate, Utc};
use rentbook_shared::types::{
    InvoiceId, LeaseId, LineItemId, PropertyId, TenantId, UnitId, round_money,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::line_item::InvoiceLineItem;

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Being assembled.
    Draft,
    /// Waiting on meter readings.
    PendingUtilities,
    /// Complete and ready to issue.
    Ready,
    /// Issued to the tenant.
    Issued,
    /// Some payment received.
    #[serde(rename = "partial", alias = "partially_paid")]
    PartiallyPaid,
    /// Fully paid.
    Paid,
    /// Past due with a balance.
    Overdue,
    /// Rolled into a later invoice.
    Consolidated,
    /// Cancelled; never deleted.
    Cancelled,
    /// Closed for edits by the billing cycle.
    Finalized,
}

impl InvoiceStatus {
    /// Returns true if line items can no longer be added or removed.
    #[must_use]
    pub const fn is_locked(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled | Self::Finalized)
    }

    /// Returns true if this status was derived from received payments.
    #[must_use]
    pub const fn is_payment_derived(self) -> bool {
        matches!(self, Self::Paid | Self::PartiallyPaid)
    }

    /// Returns true while the invoice has not been issued yet.
    #[must_use]
    pub const fn is_pre_issue(self) -> bool {
        matches!(self, Self::Draft | Self::PendingUtilities | Self::Ready)
    }

    /// Returns the stored name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingUtilities => "pending_utilities",
            Self::Ready => "ready",
            Self::Issued => "issued",
            Self::PartiallyPaid => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Consolidated => "consolidated",
            Self::Cancelled => "cancelled",
            Self::Finalized => "finalized",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deposit movement billed through an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DepositAction {
    /// Bill a deposit: receivable against the deposit liability.
    Issue {
        /// Deposit amount.
        amount: Decimal,
    },
    /// Return a deposit: liability against cash.
    Refund {
        /// Refunded amount.
        amount: Decimal,
    },
}

/// Kind of line-item edit recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A line item was added.
    LineItemAdded,
    /// A line item was removed.
    LineItemRemoved,
}

/// One audit-trail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// What happened.
    pub action: AuditAction,
    /// The line item affected.
    pub line_item_id: LineItemId,
    /// Description of the line item at the time.
    pub description: String,
    /// Amount of the line item at the time.
    pub amount: Decimal,
    /// Caller-supplied reason.
    pub reason: String,
    /// When it happened.
    pub at: DateTime<Utc>,
}

/// Invoice metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceMeta {
    /// Append-only log of line-item edits.
    #[serde(default)]
    pub audit_trail: Vec<AuditRecord>,
    /// Deposit movement to post with the invoice.
    pub deposit_action: Option<DepositAction>,
    /// Caller-defined extras.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The billing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier.
    pub id: InvoiceId,
    /// Human-readable number.
    pub invoice_number: String,
    /// Issue date.
    pub date_issued: NaiveDate,
    /// Due date.
    pub due_date: NaiveDate,
    /// Lifecycle status.
    pub status: InvoiceStatus,
    /// Property billed.
    pub property_id: PropertyId,
    /// Tenant billed.
    pub tenant_id: TenantId,
    /// Lease the charges come from.
    pub lease_id: Option<LeaseId>,
    /// Unit the charges come from.
    pub units_id: Option<UnitId>,
    /// Billable components, owned by this invoice.
    pub line_items: Vec<InvoiceLineItem>,
    /// Sum of line item amounts.
    pub subtotal_amount: Decimal,
    /// Tax on top of the subtotal.
    pub tax_amount: Decimal,
    /// `subtotal_amount + tax_amount`.
    pub total_amount: Decimal,
    /// Late fee assessed (informational).
    pub late_fee: Decimal,
    /// Cash received against this invoice.
    pub total_paid: Decimal,
    /// Cash plus applied credit, capped at `total_amount`.
    pub effective_paid: Decimal,
    /// `max(0, cash + applied credit - total_amount)`.
    pub overpaid_amount: Decimal,
    /// `max(0, total_amount - effective_paid)`.
    pub balance_amount: Decimal,
    /// Optimistic-concurrency token, bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
    /// Audit trail and deposit flags.
    #[serde(default)]
    pub meta: InvoiceMeta,
}

impl Invoice {
    /// Creates a draft invoice with no line items.
    #[must_use]
    pub fn new(
        invoice_number: impl Into<String>,
        tenant_id: TenantId,
        property_id: PropertyId,
        date_issued: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            id: InvoiceId::new(),
            invoice_number: invoice_number.into(),
            date_issued,
            due_date,
            status: InvoiceStatus::Draft,
            property_id,
            tenant_id,
            lease_id: None,
            units_id: None,
            line_items: Vec::new(),
            subtotal_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            late_fee: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            effective_paid: Decimal::ZERO,
            overpaid_amount: Decimal::ZERO,
            balance_amount: Decimal::ZERO,
            version: 0,
            meta: InvoiceMeta::default(),
        }
    }

    /// Adds a line item and recomputes totals.
    #[must_use]
    pub fn with_line_item(mut self, item: InvoiceLineItem) -> Self {
        self.line_items.push(item);
        self.recompute_totals();
        self
    }

    /// Sets the tax amount and recomputes totals.
    #[must_use]
    pub fn with_tax(mut self, tax_amount: Decimal) -> Self {
        self.tax_amount = tax_amount;
        self.recompute_totals();
        self
    }

    /// Sets the lease and unit references.
    #[must_use]
    pub fn with_lease(mut self, lease_id: LeaseId, units_id: Option<UnitId>) -> Self {
        self.lease_id = Some(lease_id);
        self.units_id = units_id;
        self
    }

    /// Flags a deposit movement to post alongside the charges.
    #[must_use]
    pub fn with_deposit_action(mut self, action: DepositAction) -> Self {
        self.meta.deposit_action = Some(action);
        self
    }

    /// Recomputes `subtotal_amount` and `total_amount` from the line items,
    /// and `balance_amount` from the cached `effective_paid`.
    pub fn recompute_totals(&mut self) {
        self.subtotal_amount = round_money(self.line_items.iter().map(|i| i.amount).sum());
        self.total_amount = round_money(self.subtotal_amount + self.tax_amount);
        self.balance_amount = (self.total_amount - self.effective_paid).max(Decimal::ZERO);
    }

    /// Looks up a line item.
    #[must_use]
    pub fn line_item(&self, id: LineItemId) -> Option<&InvoiceLineItem> {
        self.line_items.iter().find(|i| i.id == id)
    }

    /// Line items that payments may be allocated to.
    pub fn allocatable_items(&self) -> impl Iterator<Item = &InvoiceLineItem> {
        self.line_items.iter().filter(|i| i.is_allocatable())
    }

    /// Correlation code written on this invoice's ledger entries.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("INV-{}", self.invoice_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::line_item::LineItemCategory;
    use rust_decimal_macros::dec;

    fn make_invoice() -> Invoice {
        Invoice::new(
            "2026-001",
            TenantId::new(),
            PropertyId::new(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
        )
    }

    #[test]
    fn test_totals_follow_line_items() {
        let invoice = make_invoice()
            .with_line_item(InvoiceLineItem::new(LineItemCategory::Rent, "Rent", dec!(15000)))
            .with_line_item(InvoiceLineItem::new(LineItemCategory::Utility, "Water", dec!(2000)))
            .with_tax(dec!(150.555));

        assert_eq!(invoice.subtotal_amount, dec!(17000));
        assert_eq!(invoice.total_amount, dec!(17150.56));
        assert_eq!(invoice.balance_amount, dec!(17150.56));
    }

    #[test]
    fn test_recompute_after_removal() {
        let mut invoice = make_invoice()
            .with_line_item(InvoiceLineItem::new(LineItemCategory::Rent, "Rent", dec!(1000)))
            .with_line_item(InvoiceLineItem::new(LineItemCategory::Misc, "Key", dec!(25)));
        invoice.effective_paid = dec!(1000);
        invoice.line_items.pop();
        invoice.recompute_totals();

        assert_eq!(invoice.total_amount, dec!(1000));
        assert_eq!(invoice.balance_amount, Decimal::ZERO);
    }

    #[test]
    fn test_status_flags() {
        assert!(InvoiceStatus::Paid.is_locked());
        assert!(InvoiceStatus::Cancelled.is_locked());
        assert!(InvoiceStatus::Finalized.is_locked());
        assert!(!InvoiceStatus::PartiallyPaid.is_locked());
        assert!(!InvoiceStatus::Issued.is_locked());
        assert!(InvoiceStatus::Ready.is_pre_issue());
    }

    #[test]
    fn test_partial_status_serde() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::PartiallyPaid).unwrap(),
            "\"partial\""
        );
        let status: InvoiceStatus = serde_json::from_str("\"partially_paid\"").unwrap();
        assert_eq!(status, InvoiceStatus::PartiallyPaid);
    }

    #[test]
    fn test_deposit_action_serde() {
        let json = serde_json::to_value(DepositAction::Issue { amount: dec!(500) }).unwrap();
        assert_eq!(json["action"], "issue");
    }
}
