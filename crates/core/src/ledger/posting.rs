//! Posting builders.
//!
//! Every ledger-affecting operation assembles its entries through a
//! [`Journal`], which stamps the shared references, rounds amounts, drops
//! zero-amount legs and checks the balance before handing the batch back.

use chrono::{DateTime, Utc};
use rentbook_shared::types::{
    InvoiceId, LedgerEntryId, LineItemId, PropertyId, TenantId, round_money,
};
use rust_decimal::Decimal;

use super::allocation::{Allocation, WaterfallResult};
use super::chart::{Account, ChartOfAccounts};
use super::entry::{LedgerEntry, TransactionType};
use super::error::LedgerError;
use super::validation::{EntryTotals, validate_balance};
use crate::invoice::{DepositAction, Invoice, InvoiceLineItem, LineItemCategory};

/// Category written on overpayment legs.
pub const OVERPAYMENT_CATEGORY: &str = "overpayment";
/// Category written on invoice-level tax legs.
pub const TAX_CATEGORY: &str = "invoice_tax";

/// References shared by every entry of one posting.
#[derive(Debug, Clone)]
pub struct PostingContext {
    /// Effective date.
    pub date: DateTime<Utc>,
    /// Economic event.
    pub transaction_type: TransactionType,
    /// Correlation code.
    pub reference: String,
    /// Invoice the posting belongs to.
    pub invoice_id: Option<InvoiceId>,
    /// Property the posting belongs to.
    pub property_id: Option<PropertyId>,
    /// Tenant the posting belongs to.
    pub tenant_id: Option<TenantId>,
}

impl PostingContext {
    /// Creates a context with no invoice, tenant or property.
    #[must_use]
    pub fn new(
        date: DateTime<Utc>,
        transaction_type: TransactionType,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            date,
            transaction_type,
            reference: reference.into(),
            invoice_id: None,
            property_id: None,
            tenant_id: None,
        }
    }

    /// Creates a context carrying an invoice's references.
    #[must_use]
    pub fn for_invoice(
        invoice: &Invoice,
        date: DateTime<Utc>,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            invoice_id: Some(invoice.id),
            property_id: Some(invoice.property_id),
            tenant_id: Some(invoice.tenant_id),
            ..Self::new(date, transaction_type, invoice.reference())
        }
    }

    /// Sets the tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Sets the property.
    #[must_use]
    pub fn with_property(mut self, property_id: Option<PropertyId>) -> Self {
        self.property_id = property_id;
        self
    }

    /// Returns a copy with a different transaction type.
    #[must_use]
    pub fn retyped(&self, transaction_type: TransactionType) -> Self {
        Self {
            transaction_type,
            ..self.clone()
        }
    }

    /// Rounds an amount to money precision.
    #[must_use]
    pub fn round(&self, amount: Decimal) -> Decimal {
        round_money(amount)
    }
}

/// Accumulates the legs of one balanced posting.
#[derive(Debug)]
pub struct Journal {
    ctx: PostingContext,
    entries: Vec<LedgerEntry>,
}

impl Journal {
    /// Starts an empty journal.
    #[must_use]
    pub fn new(ctx: PostingContext) -> Self {
        Self {
            ctx,
            entries: Vec::new(),
        }
    }

    /// The context entries are stamped with.
    #[must_use]
    pub fn context(&self) -> &PostingContext {
        &self.ctx
    }

    /// Adds a debit leg. Zero amounts are dropped.
    pub fn debit(
        &mut self,
        account: Account,
        amount: Decimal,
        category: &str,
        line_item_id: Option<LineItemId>,
    ) -> &mut Self {
        self.push(account, self.ctx.round(amount), Decimal::ZERO, category, line_item_id);
        self
    }

    /// Adds a credit leg. Zero amounts are dropped.
    pub fn credit(
        &mut self,
        account: Account,
        amount: Decimal,
        category: &str,
        line_item_id: Option<LineItemId>,
    ) -> &mut Self {
        self.push(account, Decimal::ZERO, self.ctx.round(amount), category, line_item_id);
        self
    }

    /// Adds a debit and a credit of the same amount.
    pub fn pair(
        &mut self,
        debit: Account,
        credit: Account,
        amount: Decimal,
        category: &str,
        line_item_id: Option<LineItemId>,
    ) -> &mut Self {
        self.debit(debit, amount, category, line_item_id)
            .credit(credit, amount, category, line_item_id)
    }

    /// Appends already-built entries.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = LedgerEntry>) -> &mut Self {
        self.entries.extend(entries);
        self
    }

    /// Returns true if no legs were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validates the balance and returns the legs.
    pub fn finish(self) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let totals = validate_balance(&self.entries)?;
        Ok((self.entries, totals))
    }

    fn push(
        &mut self,
        account: Account,
        debit: Decimal,
        credit: Decimal,
        category: &str,
        line_item_id: Option<LineItemId>,
    ) {
        if debit.is_zero() && credit.is_zero() {
            return;
        }
        self.entries.push(LedgerEntry {
            id: LedgerEntryId::new(),
            date: self.ctx.date,
            account: account.name.to_string(),
            account_code: account.code.to_string(),
            account_type: account.account_type,
            debit,
            credit,
            category: category.to_string(),
            invoice_id: self.ctx.invoice_id,
            line_item_id,
            property_id: self.ctx.property_id,
            tenant_id: self.ctx.tenant_id,
            transaction_type: self.ctx.transaction_type,
            reference: self.ctx.reference.clone(),
        });
    }
}

/// Stateless builders for each kind of posting.
pub struct PostingService;

impl PostingService {
    /// Charges for one line item: debit its receivable, credit its income or
    /// liability account. Balance-forward items post nothing.
    pub fn charge_line_item<C: ChartOfAccounts + ?Sized>(
        journal: &mut Journal,
        chart: &C,
        item: &InvoiceLineItem,
    ) {
        if item.is_balance_forwarded {
            return;
        }
        let category = item.ledger_category();
        journal.pair(
            chart.resolve_ar_for(item.category),
            chart.resolve(item.category),
            item.amount,
            &category,
            Some(item.id),
        );
    }

    /// Issuance charges for a whole invoice, including tax and any deposit
    /// movement flagged on it.
    pub fn invoice_issue<C: ChartOfAccounts + ?Sized>(
        ctx: PostingContext,
        chart: &C,
        invoice: &Invoice,
    ) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let mut journal = Journal::new(ctx);
        for item in &invoice.line_items {
            Self::charge_line_item(&mut journal, chart, item);
        }
        journal.pair(
            chart.receivable(),
            chart.tax_payable(),
            invoice.tax_amount,
            TAX_CATEGORY,
            None,
        );

        if let Some(action) = invoice.meta.deposit_action {
            let mut deposit = Journal::new(journal.context().retyped(match action {
                DepositAction::Issue { .. } => TransactionType::DepositIssue,
                DepositAction::Refund { .. } => TransactionType::DepositRefund,
            }));
            Self::deposit(&mut deposit, chart, action);
            let (entries, _) = deposit.finish()?;
            journal.extend(entries);
        }

        journal.finish()
    }

    /// Deposit movement: billed deposits raise the receivable against the
    /// liability, refunds release the liability against cash.
    pub fn deposit<C: ChartOfAccounts + ?Sized>(
        journal: &mut Journal,
        chart: &C,
        action: DepositAction,
    ) {
        match action {
            DepositAction::Issue { amount } => {
                journal.pair(
                    chart.resolve_ar_for(LineItemCategory::Deposit),
                    chart.deposit_liability(),
                    amount,
                    "deposit",
                    None,
                );
            }
            DepositAction::Refund { amount } => {
                journal.pair(
                    chart.deposit_liability(),
                    chart.cash(),
                    amount,
                    "deposit",
                    None,
                );
            }
        }
    }

    /// Payment receipt: one cash debit for the full amount, one receivable
    /// credit per allocation, and a tenant-credit leg for any overpayment.
    pub fn payment<C: ChartOfAccounts + ?Sized>(
        ctx: PostingContext,
        chart: &C,
        amount: Decimal,
        waterfall: &WaterfallResult,
    ) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let mut journal = Journal::new(ctx);
        journal.debit(chart.cash(), amount, "payment", None);

        Self::settle_allocations(&mut journal, chart, &waterfall.allocations);

        if waterfall.overpayment > Decimal::ZERO {
            let mut overpayment =
                Journal::new(journal.context().retyped(TransactionType::OverpaymentCredit));
            overpayment.credit(
                chart.tenant_credit(),
                waterfall.overpayment,
                OVERPAYMENT_CATEGORY,
                None,
            );
            journal.extend(overpayment.entries);
        }

        journal.finish()
    }

    /// Tenant credit consumed by an invoice: one tenant-credit debit, one
    /// receivable credit per allocation.
    pub fn credit_settlement<C: ChartOfAccounts + ?Sized>(
        ctx: PostingContext,
        chart: &C,
        waterfall: &WaterfallResult,
    ) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let mut journal = Journal::new(ctx);
        journal.debit(
            chart.tenant_credit(),
            waterfall.total_allocated(),
            "tenant_credit",
            None,
        );
        Self::settle_allocations(&mut journal, chart, &waterfall.allocations);
        journal.finish()
    }

    /// Captures an overpayment found during a status sync.
    ///
    /// `over_credited` lists receivables whose credits exceed their debits,
    /// with the excess. They are debited back to zero first; any remainder
    /// lands on the generic receivable.
    pub fn overpayment_capture<C: ChartOfAccounts + ?Sized>(
        ctx: PostingContext,
        chart: &C,
        over_credited: &[(Account, Decimal)],
        amount: Decimal,
    ) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let amount = ctx.round(amount);
        let mut journal = Journal::new(ctx);
        let mut remaining = amount;
        for &(account, excess) in over_credited {
            let take = excess.min(remaining).max(Decimal::ZERO);
            journal.debit(account, take, OVERPAYMENT_CATEGORY, None);
            remaining -= journal.context().round(take);
        }
        journal
            .debit(chart.receivable(), remaining, OVERPAYMENT_CATEGORY, None)
            .credit(chart.tenant_credit(), amount, OVERPAYMENT_CATEGORY, None);
        journal.finish()
    }

    /// Consumes tenant credit against a target account.
    pub fn credit_application<C: ChartOfAccounts + ?Sized>(
        ctx: PostingContext,
        chart: &C,
        target: Account,
        amount: Decimal,
    ) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let mut journal = Journal::new(ctx);
        journal.pair(chart.tenant_credit(), target, amount, "tenant_credit", None);
        journal.finish()
    }

    /// Grants tenant credit for waived charges.
    pub fn credit_grant<C: ChartOfAccounts + ?Sized>(
        ctx: PostingContext,
        chart: &C,
        amount: Decimal,
    ) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let mut journal = Journal::new(ctx);
        journal.pair(
            chart.concessions(),
            chart.tenant_credit(),
            amount,
            "tenant_credit",
            None,
        );
        journal.finish()
    }

    /// Deposit refund with a deduction recognised as income.
    ///
    /// `deduction = round(deposit * ratio)` and `net = deposit - deduction`,
    /// so the three legs balance exactly after rounding.
    pub fn deposit_refund_with_deduction<C: ChartOfAccounts + ?Sized>(
        ctx: PostingContext,
        chart: &C,
        deposit: Decimal,
        deduction_ratio: Decimal,
    ) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let deposit = ctx.round(deposit);
        let deduction = ctx.round(deposit * deduction_ratio);
        let net_refund = deposit - deduction;

        let mut journal = Journal::new(ctx);
        journal
            .debit(chart.deposit_liability(), deposit, "deposit", None)
            .credit(chart.cash(), net_refund, "deposit", None)
            .credit(chart.deduction_income(), deduction, "deposit_deduction", None);
        journal.finish()
    }

    /// Capital expenditure paid in cash.
    pub fn capex<C: ChartOfAccounts + ?Sized>(
        ctx: PostingContext,
        chart: &C,
        asset: Option<Account>,
        amount: Decimal,
    ) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let mut journal = Journal::new(ctx);
        journal.pair(
            asset.unwrap_or_else(|| chart.equipment()),
            chart.cash(),
            amount,
            "capex",
            None,
        );
        journal.finish()
    }

    fn settle_allocations<C: ChartOfAccounts + ?Sized>(
        journal: &mut Journal,
        chart: &C,
        allocations: &[Allocation],
    ) {
        for allocation in allocations {
            let receivable = if allocation.line_item_id.is_some() {
                chart.resolve_ar_for(allocation.category)
            } else {
                chart.receivable()
            };
            journal.credit(
                receivable,
                allocation.amount,
                &allocation.ledger_category,
                allocation.line_item_id,
            );
        }
    }

    /// Periodic depreciation.
    pub fn depreciation<C: ChartOfAccounts + ?Sized>(
        ctx: PostingContext,
        chart: &C,
        amount: Decimal,
    ) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let mut journal = Journal::new(ctx);
        journal.pair(
            chart.depreciation_expense(),
            chart.accumulated_depreciation(),
            amount,
            "depreciation",
            None,
        );
        journal.finish()
    }
}
