//! Ledger entry domain types.
//!
//! The ledger is append-only: entries are created once by a posting and never
//! updated or deleted. Corrections are new reversing entries.

use chrono::{DateTime, Utc};
use rentbook_shared::types::{InvoiceId, LedgerEntryId, LineItemId, PropertyId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Debit entry (increases assets/expenses, decreases liabilities/equity/income).
    Debit,
    /// Credit entry (decreases assets/expenses, increases liabilities/equity/income).
    Credit,
}

impl EntryType {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// Account classification in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Resources owned (cash, receivables, equipment).
    Asset,
    /// Amounts owed (deposits held, tenant credit, taxes).
    Liability,
    /// Earned revenue.
    Income,
    /// Costs incurred.
    Expense,
    /// Offsets an asset (accumulated depreciation).
    #[serde(rename = "Contra-Asset")]
    ContraAsset,
    /// Owner's residual interest.
    Equity,
}

impl AccountType {
    /// Returns true for accounts whose balance grows with debits.
    #[must_use]
    pub const fn is_debit_normal(self) -> bool {
        matches!(self, Self::Asset | Self::Expense)
    }

    /// Balance change for a debit/credit pair under this account's normal side.
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        if self.is_debit_normal() {
            debit - credit
        } else {
            credit - debit
        }
    }
}

/// The economic event a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Charges posted when an invoice is issued.
    InvoiceIssue,
    /// Cash received against an invoice.
    PaymentReceived,
    /// Credit granted to a tenant (waived charges).
    TenantCredit,
    /// Tenant credit consumed against a receivable.
    CreditApplied,
    /// Security deposit billed.
    DepositIssue,
    /// Security deposit returned.
    DepositRefund,
    /// Capital expenditure.
    Capex,
    /// Monthly depreciation.
    Depreciation,
    /// Line item added after issuance.
    LineItemAddition,
    /// Mirror of a removed line item's charge.
    LineItemReversal,
    /// Manual adjustment.
    Adjustment,
    /// Utility charge added after issuance.
    UtilityAddition,
    /// Overpayment captured as tenant credit.
    OverpaymentCredit,
}

impl TransactionType {
    /// Returns true for postings that charge a line item to a receivable.
    #[must_use]
    pub const fn is_charge(self) -> bool {
        matches!(
            self,
            Self::InvoiceIssue | Self::LineItemAddition | Self::UtilityAddition
        )
    }
}

/// One half of a double-entry posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub id: LedgerEntryId,
    /// When the event took effect.
    pub date: DateTime<Utc>,
    /// Account name.
    pub account: String,
    /// Account code in the chart of accounts.
    pub account_code: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Debit amount (0 if credit).
    pub debit: Decimal,
    /// Credit amount (0 if debit).
    pub credit: Decimal,
    /// Free-form classification, e.g. `rent`, `utility_water`, `overpayment`.
    pub category: String,
    /// Invoice this entry belongs to.
    pub invoice_id: Option<InvoiceId>,
    /// Line item this entry belongs to.
    pub line_item_id: Option<LineItemId>,
    /// Property this entry belongs to.
    pub property_id: Option<PropertyId>,
    /// Tenant this entry belongs to.
    pub tenant_id: Option<TenantId>,
    /// Event type.
    pub transaction_type: TransactionType,
    /// Human-readable correlation code.
    pub reference: String,
}

impl LedgerEntry {
    /// Returns true if this entry debits its account.
    #[must_use]
    pub fn is_debit(&self) -> bool {
        self.debit > Decimal::ZERO && self.credit.is_zero()
    }

    /// Returns true if this entry credits its account.
    #[must_use]
    pub fn is_credit(&self) -> bool {
        self.credit > Decimal::ZERO && self.debit.is_zero()
    }

    /// Returns the side of this entry, or `None` if it is not one-sided.
    #[must_use]
    pub fn entry_type(&self) -> Option<EntryType> {
        if self.is_debit() {
            Some(EntryType::Debit)
        } else if self.is_credit() {
            Some(EntryType::Credit)
        } else {
            None
        }
    }

    /// Returns the non-zero side's amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.debit.max(self.credit)
    }

    /// Returns the signed amount (positive for debit, negative for credit).
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.debit - self.credit
    }
}
