//! Tenant credit, deposit refunds and asset postings.

use chrono::{DateTime, Utc};
use rentbook_shared::types::{InvoiceId, PropertyId, TenantId};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use super::service::{DocumentWrite, LedgerEngine, reject};
use super::store::{EntryFilter, LedgerStore, PostingBatch};
use crate::invoice::{Invoice, InvoiceStatus};
use crate::ledger::{
    Account, AccountType, Allocation, ChartOfAccounts, EntryTotals, LedgerEntry, LedgerError,
    PaymentWaterfall, PostingContext, PostingService, TransactionType,
};

/// Entries written by a posting that does not touch an invoice document.
#[derive(Debug, Clone, Default)]
pub struct JournalOutcome {
    /// Entries written.
    pub entries: Vec<LedgerEntry>,
    /// Debit and credit sums over `entries`.
    pub totals: EntryTotals,
}

/// Result of [`LedgerEngine::apply_tenant_credit`].
#[derive(Debug, Clone, Default)]
pub struct CreditApplication {
    /// Entries written (empty if no credit was available).
    pub entries: Vec<LedgerEntry>,
    /// Credit consumed.
    pub applied: Decimal,
    /// Part of the request that could not be covered.
    pub unapplied: Decimal,
    /// Waterfall allocations when the credit settled an invoice.
    pub allocations: Vec<Allocation>,
    /// The invoice as stored after the credit, when one was named.
    pub invoice: Option<Invoice>,
}

impl CreditApplication {
    fn nothing(requested: Decimal) -> Self {
        Self {
            unapplied: requested,
            ..Self::default()
        }
    }
}

impl<S: LedgerStore, C: ChartOfAccounts> LedgerEngine<S, C> {
    /// Credit a tenant holds: `credit - debit` on the tenant credit account.
    pub async fn get_tenant_credit_balance(&self, tenant_id: TenantId) -> Result<Decimal, LedgerError> {
        let totals = self
            .store
            .sum_entries(&EntryFilter::tenant(tenant_id).with_account(self.chart.tenant_credit().code))
            .await?;
        Ok(totals.net_credit())
    }

    /// Consumes a tenant's credit.
    ///
    /// Applies `min(requested, available)`. Without an invoice the credit
    /// settles `target` (the generic receivable unless given). With an
    /// invoice it runs down the payment waterfall instead: capped at what the
    /// invoice still owes, credited to each line item's receivable, and the
    /// invoice cache is recomputed in the same batch. Applied credit settles
    /// the invoice but never counts as cash paid.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, requested = %requested))]
    pub async fn apply_tenant_credit(
        &self,
        tenant_id: TenantId,
        requested: Decimal,
        target: Option<Account>,
        invoice_id: Option<InvoiceId>,
        date: Option<DateTime<Utc>>,
    ) -> Result<CreditApplication, LedgerError> {
        let requested = self.round(requested);
        if requested <= Decimal::ZERO {
            return Err(reject(LedgerError::InvalidArgument(format!(
                "credit to apply must be positive, got {requested}"
            ))));
        }
        let date = date.unwrap_or_else(Utc::now);

        let _guard = self.lock_tenant(tenant_id).await;
        if let Some(invoice_id) = invoice_id {
            if target.is_some() {
                return Err(reject(LedgerError::InvalidArgument(
                    "credit applied to an invoice cannot name a target account".to_string(),
                )));
            }
            return self.settle_invoice_with_credit(tenant_id, requested, invoice_id, date).await;
        }

        let available = self.get_tenant_credit_balance(tenant_id).await?.max(Decimal::ZERO);
        let applied = requested.min(available);
        if applied.is_zero() {
            info!(available = %available, "No tenant credit available");
            return Ok(CreditApplication::nothing(requested));
        }

        let target = target.unwrap_or_else(|| self.chart.receivable());
        let ctx = self.tenant_context(tenant_id, date, TransactionType::CreditApplied, None);
        let (entries, _) = PostingService::credit_application(ctx, &self.chart, target, applied)?;
        self.store.commit(PostingBatch::entries(entries.clone())).await?;

        info!(applied = %applied, target = target.code, "Tenant credit applied");
        Ok(CreditApplication {
            entries,
            applied,
            unapplied: requested - applied,
            ..CreditApplication::default()
        })
    }

    /// Invoice branch of [`Self::apply_tenant_credit`]. The caller holds the
    /// tenant lock; the invoice lock is taken after it.
    async fn settle_invoice_with_credit(
        &self,
        tenant_id: TenantId,
        requested: Decimal,
        invoice_id: InvoiceId,
        date: DateTime<Utc>,
    ) -> Result<CreditApplication, LedgerError> {
        let _guard = self.lock_invoice(invoice_id).await;
        let invoice = self.fetch_invoice(invoice_id).await?;
        if invoice.tenant_id != tenant_id {
            return Err(reject(LedgerError::InvalidArgument(format!(
                "invoice {} does not belong to tenant {tenant_id}",
                invoice.invoice_number
            ))));
        }
        if invoice.status == InvoiceStatus::Cancelled {
            return Err(reject(LedgerError::ImmutableInvoice {
                invoice_id,
                status: invoice.status,
            }));
        }

        let available = self.get_tenant_credit_balance(tenant_id).await?.max(Decimal::ZERO);
        let targets = self.allocation_targets(&invoice).await?;
        let owed: Decimal = targets.iter().map(|t| t.outstanding).sum();
        let applied = requested.min(available).min(owed);
        if applied.is_zero() {
            info!(available = %available, owed = %owed, "No tenant credit applicable");
            return Ok(CreditApplication {
                invoice: Some(invoice),
                ..CreditApplication::nothing(requested)
            });
        }

        let waterfall = PaymentWaterfall::allocate(applied, targets);
        let ctx = self.context(&invoice, date, TransactionType::CreditApplied);
        let (entries, _) = PostingService::credit_settlement(ctx, &self.chart, &waterfall)?;
        let outcome = self
            .commit_and_sync(invoice, DocumentWrite::Update, entries, Some(date))
            .await?;

        info!(
            applied = %applied,
            status = %outcome.invoice.status,
            balance = %outcome.invoice.balance_amount,
            "Tenant credit applied to invoice"
        );
        Ok(CreditApplication {
            entries: outcome.entries,
            applied,
            unapplied: requested - applied,
            allocations: waterfall.allocations,
            invoice: Some(outcome.invoice),
        })
    }

    /// Grants a tenant credit for waived charges.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, amount = %amount))]
    pub async fn grant_tenant_credit(
        &self,
        tenant_id: TenantId,
        amount: Decimal,
        reason: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<JournalOutcome, LedgerError> {
        let amount = self.positive(amount, "credit amount")?;
        let ctx = self.tenant_context(
            tenant_id,
            date.unwrap_or_else(Utc::now),
            TransactionType::TenantCredit,
            Some(reason),
        );
        let outcome = self
            .commit_journal(PostingService::credit_grant(ctx, &self.chart, amount)?)
            .await?;
        info!(reason = %reason, "Tenant credit granted");
        Ok(outcome)
    }

    /// Refunds a deposit, keeping `deposit * ratio` as maintenance income.
    ///
    /// Debits the full deposit liability, credits cash for the net refund
    /// and the deduction income account for the deduction.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, deposit = %deposit, ratio = %deduction_ratio))]
    pub async fn refund_deposit_with_deduction(
        &self,
        tenant_id: TenantId,
        property_id: Option<PropertyId>,
        deposit: Decimal,
        deduction_ratio: Decimal,
        date: Option<DateTime<Utc>>,
    ) -> Result<JournalOutcome, LedgerError> {
        let deposit = self.positive(deposit, "deposit")?;
        if !(Decimal::ZERO..=Decimal::ONE).contains(&deduction_ratio) {
            return Err(reject(LedgerError::InvalidArgument(format!(
                "deduction ratio must be between 0 and 1, got {deduction_ratio}"
            ))));
        }
        let ctx = self
            .tenant_context(
                tenant_id,
                date.unwrap_or_else(Utc::now),
                TransactionType::DepositRefund,
                None,
            )
            .with_property(property_id);
        let outcome = self
            .commit_journal(PostingService::deposit_refund_with_deduction(
                ctx,
                &self.chart,
                deposit,
                deduction_ratio,
            )?)
            .await?;
        info!(entries = outcome.entries.len(), "Deposit refunded");
        Ok(outcome)
    }

    /// Posts a capital expenditure paid in cash.
    ///
    /// `asset_code` selects the asset account; equipment is the default.
    /// Cash and receivables are not capitalisable.
    #[instrument(skip_all, fields(amount = %amount, reference = %reference))]
    pub async fn post_capex(
        &self,
        amount: Decimal,
        asset_code: Option<&str>,
        property_id: Option<PropertyId>,
        reference: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<JournalOutcome, LedgerError> {
        let amount = self.positive(amount, "capex amount")?;
        let asset = asset_code.map(|code| self.capex_asset(code)).transpose()?;
        let ctx = self
            .standalone_context(date, TransactionType::Capex, reference)
            .with_property(property_id);
        let outcome = self
            .commit_journal(PostingService::capex(ctx, &self.chart, asset, amount)?)
            .await?;
        info!("Capex posted");
        Ok(outcome)
    }

    /// Posts periodic depreciation.
    #[instrument(skip_all, fields(amount = %amount, reference = %reference))]
    pub async fn post_depreciation(
        &self,
        amount: Decimal,
        property_id: Option<PropertyId>,
        reference: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<JournalOutcome, LedgerError> {
        let amount = self.positive(amount, "depreciation amount")?;
        let ctx = self
            .standalone_context(date, TransactionType::Depreciation, reference)
            .with_property(property_id);
        let outcome = self
            .commit_journal(PostingService::depreciation(ctx, &self.chart, amount)?)
            .await?;
        info!("Depreciation posted");
        Ok(outcome)
    }

    async fn commit_journal(
        &self,
        (entries, totals): (Vec<LedgerEntry>, EntryTotals),
    ) -> Result<JournalOutcome, LedgerError> {
        self.store.commit(PostingBatch::entries(entries.clone())).await?;
        Ok(JournalOutcome { entries, totals })
    }

    fn capex_asset(&self, code: &str) -> Result<Account, LedgerError> {
        let account = self.chart.account_by_code(code).ok_or_else(|| {
            reject(LedgerError::InvalidArgument(format!("unknown asset account {code}")))
        })?;
        if account.account_type != AccountType::Asset
            || account.code == self.chart.cash().code
            || self.chart.is_receivable(account.code)
        {
            return Err(reject(LedgerError::InvalidArgument(format!(
                "account {code} ({}) cannot hold capital expenditure",
                account.name
            ))));
        }
        Ok(account)
    }

    fn positive(&self, amount: Decimal, what: &str) -> Result<Decimal, LedgerError> {
        let amount = self.round(amount);
        if amount <= Decimal::ZERO {
            return Err(reject(LedgerError::InvalidArgument(format!(
                "{what} must be positive, got {amount}"
            ))));
        }
        Ok(amount)
    }

    fn tenant_context(
        &self,
        tenant_id: TenantId,
        date: DateTime<Utc>,
        transaction_type: TransactionType,
        reference: Option<&str>,
    ) -> PostingContext {
        let reference = reference.map_or_else(|| format!("TENANT-{tenant_id}"), str::to_string);
        PostingContext::new(date, transaction_type, reference)
            .with_tenant(tenant_id)
    }

    fn standalone_context(
        &self,
        date: Option<DateTime<Utc>>,
        transaction_type: TransactionType,
        reference: &str,
    ) -> PostingContext {
        PostingContext::new(date.unwrap_or_else(Utc::now), transaction_type, reference)
    }
}
