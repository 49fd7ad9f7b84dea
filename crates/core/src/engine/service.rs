//! Ledger engine: invoice issuance, payments, line-item edits and the
//! invoice payment cache.
//!
//! Every operation validates its batch before touching the store and then
//! writes entries and the invoice document in one [`PostingBatch`]. The
//! invoice cache is recomputed from the ledger inside that same batch, so a
//! caller never observes entries without the matching cache update.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use dashmap::DashMap;
use rentbook_shared::types::{InvoiceId, LineItemId, TenantId, round_money};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use super::settings::LedgerSettings;
use super::store::{EntryFilter, InvoiceWrite, LedgerStore, PostingBatch, StoreError};
use crate::invoice::{
    AuditAction, AuditRecord, DepositAction, Invoice, InvoiceLineItem, InvoiceStatus, LineItemCategory,
    PaymentProjection,
};
use crate::ledger::posting::TAX_CATEGORY;
use crate::ledger::{
    Account, Allocation, AllocationTarget, ChartOfAccounts, EntryTotals, Journal, LedgerEntry,
    LedgerError, PaymentWaterfall, PostingContext, PostingService, ReversalService,
    StandardChart, TransactionType, validate_balance,
};

/// Result of an operation that posted against an invoice.
#[derive(Debug, Clone)]
pub struct PostingOutcome {
    /// The invoice as stored after the operation.
    pub invoice: Invoice,
    /// Every entry written, including any overpayment capture.
    pub entries: Vec<LedgerEntry>,
    /// Debit and credit sums over `entries`.
    pub totals: EntryTotals,
}

/// Result of [`LedgerEngine::post_payment`].
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    /// The invoice as stored after the payment.
    pub invoice: Invoice,
    /// Every entry written.
    pub entries: Vec<LedgerEntry>,
    /// Waterfall allocations in payment order.
    pub allocations: Vec<Allocation>,
    /// Part of the payment captured as tenant credit.
    pub overpayment: Decimal,
}

/// Result of a payment-status sync.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// The invoice as stored after the sync.
    pub invoice: Invoice,
    /// Entries written by the sync.
    pub entries: Vec<LedgerEntry>,
    /// True if anything was written.
    pub changed: bool,
}

impl From<SyncOutcome> for PostingOutcome {
    fn from(outcome: SyncOutcome) -> Self {
        let totals = EntryTotals::of(&outcome.entries);
        Self {
            invoice: outcome.invoice,
            entries: outcome.entries,
            totals,
        }
    }
}

/// How the invoice document reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentWrite {
    /// New document.
    Insert,
    /// Existing document at the version it was read.
    Update,
    /// Existing document, written only if the sync changes something.
    UpdateIfChanged,
}

/// Double-entry ledger engine over a [`LedgerStore`].
pub struct LedgerEngine<S, C = StandardChart> {
    pub(crate) store: Arc<S>,
    pub(crate) chart: C,
    pub(crate) settings: LedgerSettings,
    invoice_locks: DashMap<InvoiceId, Arc<Mutex<()>>>,
    tenant_locks: DashMap<TenantId, Arc<Mutex<()>>>,
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Creates an engine with the standard chart and default settings.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_chart(store, StandardChart, LedgerSettings::default())
    }
}

impl<S: LedgerStore, C: ChartOfAccounts> LedgerEngine<S, C> {
    /// Creates an engine with an injected chart of accounts.
    #[must_use]
    pub fn with_chart(store: Arc<S>, chart: C, settings: LedgerSettings) -> Self {
        Self {
            store,
            chart,
            settings,
            invoice_locks: DashMap::new(),
            tenant_locks: DashMap::new(),
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: LedgerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The chart of accounts.
    #[must_use]
    pub fn chart(&self) -> &C {
        &self.chart
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> LedgerSettings {
        self.settings
    }

    // ========== Invoice Issuance ==========

    /// Posts the charges of an invoice and persists the document.
    ///
    /// Each line item not carried forward is charged to its receivable
    /// sub-account against its income or liability account. Invoice tax and
    /// any flagged deposit movement are posted in the same batch. Draft,
    /// pending and ready invoices become `issued`. The document is inserted
    /// if new, otherwise updated at the version the caller read.
    ///
    /// The engine does not deduplicate: posting the same invoice twice
    /// charges it twice.
    #[instrument(
        skip_all,
        fields(invoice_id = %invoice.id, invoice_number = %invoice.invoice_number)
    )]
    pub async fn post_invoice(&self, mut invoice: Invoice) -> Result<PostingOutcome, LedgerError> {
        Self::check_document(&invoice).map_err(reject)?;

        let _guard = self.lock_invoice(invoice.id).await;
        let existing = self.store.find_invoice(invoice.id).await?;
        if let Some(stored) = &existing
            && stored.status == InvoiceStatus::Cancelled
        {
            return Err(reject(LedgerError::ImmutableInvoice {
                invoice_id: stored.id,
                status: stored.status,
            }));
        }

        self.round_document(&mut invoice);
        if invoice.status.is_pre_issue() {
            invoice.status = InvoiceStatus::Issued;
        }

        let date = invoice.date_issued.and_time(NaiveTime::MIN).and_utc();
        let ctx = self.context(&invoice, date, TransactionType::InvoiceIssue);
        let (entries, _) = PostingService::invoice_issue(ctx, &self.chart, &invoice)?;

        let write = if existing.is_some() {
            DocumentWrite::Update
        } else {
            DocumentWrite::Insert
        };
        let outcome = PostingOutcome::from(self.commit_and_sync(invoice, write, entries, Some(date)).await?);

        info!(
            entries = outcome.entries.len(),
            total = %outcome.invoice.total_amount,
            status = %outcome.invoice.status,
            "Invoice posted"
        );
        Ok(outcome)
    }

    // ========== Payments ==========

    /// Posts a payment against an invoice and allocates it by priority.
    ///
    /// Cash is debited for the full amount. The payment then flows down the
    /// waterfall: each allocatable item (and invoice tax) receives
    /// `min(remaining, outstanding)` in rank order, credited to its
    /// receivable. Whatever is left becomes tenant credit. The invoice cache
    /// is recomputed in the same batch.
    #[instrument(skip_all, fields(invoice_id = %invoice_id, amount = %amount))]
    pub async fn post_payment(
        &self,
        invoice_id: InvoiceId,
        amount: Decimal,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<PaymentOutcome, LedgerError> {
        let amount = self.round(amount);
        if amount <= Decimal::ZERO {
            return Err(reject(LedgerError::InvalidArgument(format!(
                "payment amount must be positive, got {amount}"
            ))));
        }
        let date = payment_date.unwrap_or_else(Utc::now);

        let _guard = self.lock_invoice(invoice_id).await;
        let invoice = self.fetch_invoice(invoice_id).await?;
        if invoice.status == InvoiceStatus::Cancelled {
            return Err(reject(LedgerError::ImmutableInvoice {
                invoice_id,
                status: invoice.status,
            }));
        }
        if invoice.total_amount <= Decimal::ZERO {
            return Err(reject(LedgerError::InvalidArgument(format!(
                "invoice {} has no payable total",
                invoice.invoice_number
            ))));
        }

        let targets = self.allocation_targets(&invoice).await?;
        let waterfall = PaymentWaterfall::allocate(amount, targets);
        let ctx = self.context(&invoice, date, TransactionType::PaymentReceived);
        let (entries, _) = PostingService::payment(ctx, &self.chart, amount, &waterfall)?;

        let outcome = self
            .commit_and_sync(invoice, DocumentWrite::Update, entries, Some(date))
            .await?;

        info!(
            allocations = waterfall.allocations.len(),
            overpayment = %waterfall.overpayment,
            status = %outcome.invoice.status,
            balance = %outcome.invoice.balance_amount,
            "Payment posted"
        );
        Ok(PaymentOutcome {
            invoice: outcome.invoice,
            entries: outcome.entries,
            allocations: waterfall.allocations,
            overpayment: waterfall.overpayment,
        })
    }

    /// Recomputes an invoice's payment cache from the ledger.
    ///
    /// `total_paid` is the sum of cash debits referencing the invoice. When a
    /// payment date is supplied, any overpayment not yet captured as tenant
    /// credit is captured now. Running it twice in a row writes nothing the
    /// second time.
    #[instrument(skip_all, fields(invoice_id = %invoice_id))]
    pub async fn sync_invoice_payment_status(
        &self,
        invoice_id: InvoiceId,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<SyncOutcome, LedgerError> {
        let _guard = self.lock_invoice(invoice_id).await;
        let invoice = self.fetch_invoice(invoice_id).await?;
        self.commit_and_sync(invoice, DocumentWrite::UpdateIfChanged, Vec::new(), payment_date)
            .await
    }

    // ========== Line Item Edits ==========

    /// Adds a line item to an issued invoice and charges it.
    ///
    /// Utility items post as `utility_addition`, everything else as
    /// `line_item_addition`. The item is stamped as manually added and the
    /// edit is recorded in the audit trail.
    #[instrument(
        skip_all,
        fields(invoice_id = %invoice_id, line_item_id = %item.id, category = %item.category)
    )]
    pub async fn add_line_item(
        &self,
        invoice_id: InvoiceId,
        mut item: InvoiceLineItem,
        reason: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<PostingOutcome, LedgerError> {
        if item.amount < Decimal::ZERO {
            return Err(reject(LedgerError::InvalidArgument(format!(
                "line item amount must not be negative, got {}",
                item.amount
            ))));
        }
        let now = date.unwrap_or_else(Utc::now);

        let _guard = self.lock_invoice(invoice_id).await;
        let mut invoice = self.fetch_invoice(invoice_id).await?;
        Self::ensure_editable(&invoice)?;
        if invoice.line_item(item.id).is_some() {
            return Err(reject(LedgerError::InvalidArgument(format!(
                "line item {} is already on invoice {}",
                item.id, invoice.invoice_number
            ))));
        }

        item.amount = self.round(item.amount);
        let transaction_type = if item.category == LineItemCategory::Utility {
            TransactionType::UtilityAddition
        } else {
            TransactionType::LineItemAddition
        };
        let mut journal = Journal::new(self.context(&invoice, now, transaction_type));
        PostingService::charge_line_item(&mut journal, &self.chart, &item);
        let (entries, _) = journal.finish()?;

        item.meta.added_manually = true;
        item.meta.reason = Some(reason.to_string());
        item.meta.added_at = Some(now);
        invoice.meta.audit_trail.push(AuditRecord {
            action: AuditAction::LineItemAdded,
            line_item_id: item.id,
            description: item.description.clone(),
            amount: item.amount,
            reason: reason.to_string(),
            at: now,
        });
        invoice.line_items.push(item);
        invoice.recompute_totals();

        let outcome = PostingOutcome::from(
            self.commit_and_sync(invoice, DocumentWrite::Update, entries, Some(now))
                .await?,
        );
        info!(
            entries = outcome.entries.len(),
            total = %outcome.invoice.total_amount,
            "Line item added"
        );
        Ok(outcome)
    }

    /// Removes a line item and posts its reversal.
    ///
    /// Balance-forward items are protected and need `allow_protected`. The
    /// reversal mirrors the item's original charge so the invoice's ledger
    /// balance returns to what it was before the item existed.
    #[instrument(skip_all, fields(invoice_id = %invoice_id, line_item_id = %line_item_id))]
    pub async fn remove_line_item(
        &self,
        invoice_id: InvoiceId,
        line_item_id: LineItemId,
        reason: &str,
        allow_protected: bool,
        date: Option<DateTime<Utc>>,
    ) -> Result<PostingOutcome, LedgerError> {
        let now = date.unwrap_or_else(Utc::now);

        let _guard = self.lock_invoice(invoice_id).await;
        let mut invoice = self.fetch_invoice(invoice_id).await?;
        Self::ensure_editable(&invoice)?;
        let Some(position) = invoice.line_items.iter().position(|i| i.id == line_item_id) else {
            return Err(reject(LedgerError::LineItemNotFound {
                invoice_id,
                line_item_id,
            }));
        };
        if invoice.line_items[position].is_protected() && !allow_protected {
            return Err(reject(LedgerError::ProtectedLineItem(line_item_id)));
        }

        let posted = self
            .store
            .find_entries(&EntryFilter::invoice(invoice_id).with_line_item(line_item_id))
            .await?;
        let ctx = self.context(&invoice, now, TransactionType::LineItemReversal);
        let (entries, _) = ReversalService::reverse_line_item(
            ctx,
            &self.chart,
            &invoice.line_items[position],
            &posted,
        )?;

        let item = invoice.line_items.remove(position);
        invoice.meta.audit_trail.push(AuditRecord {
            action: AuditAction::LineItemRemoved,
            line_item_id,
            description: item.description,
            amount: item.amount,
            reason: reason.to_string(),
            at: now,
        });
        invoice.recompute_totals();

        let outcome = PostingOutcome::from(
            self.commit_and_sync(invoice, DocumentWrite::Update, entries, Some(now))
                .await?,
        );
        info!(
            entries = outcome.entries.len(),
            total = %outcome.invoice.total_amount,
            "Line item removed"
        );
        Ok(outcome)
    }

    // ========== Reads ==========

    /// Loads an invoice, resyncing its cache first when configured to.
    #[instrument(skip_all, fields(invoice_id = %invoice_id))]
    pub async fn load_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, LedgerError> {
        if !self.settings.reconcile_on_read {
            return self.fetch_invoice(invoice_id).await;
        }
        let _guard = self.lock_invoice(invoice_id).await;
        let invoice = self.fetch_invoice(invoice_id).await?;
        let outcome = self
            .commit_and_sync(invoice, DocumentWrite::UpdateIfChanged, Vec::new(), None)
            .await?;
        if outcome.changed {
            warn!("Invoice cache was stale on read and has been repaired");
        }
        Ok(outcome.invoice)
    }

    /// Every entry referencing an invoice, in posting order.
    pub async fn invoice_entries(&self, invoice_id: InvoiceId) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.store.find_entries(&EntryFilter::invoice(invoice_id)).await?)
    }

    /// Balance of an account in its normal direction.
    ///
    /// Codes unknown to the chart are reported as `debit - credit`.
    pub async fn account_balance(&self, account_code: &str) -> Result<Decimal, LedgerError> {
        let totals = self.store.sum_entries(&EntryFilter::account(account_code)).await?;
        Ok(self.chart.account_by_code(account_code).map_or_else(
            || totals.net_debit(),
            |account| account.account_type.balance_change(totals.debit, totals.credit),
        ))
    }

    // ========== Internals ==========

    /// Projects the cache, captures any uncaptured overpayment, and writes
    /// `pending` plus the document as one batch.
    pub(crate) async fn commit_and_sync(
        &self,
        mut invoice: Invoice,
        write: DocumentWrite,
        mut pending: Vec<LedgerEntry>,
        capture_date: Option<DateTime<Utc>>,
    ) -> Result<SyncOutcome, LedgerError> {
        let cash_paid = self
            .sum_with_pending(
                &EntryFilter::invoice(invoice.id).with_account(self.chart.cash().code),
                &pending,
            )
            .await?
            .debit;
        let captured = self
            .sum_with_pending(
                &EntryFilter::invoice(invoice.id)
                    .with_account(self.chart.tenant_credit().code)
                    .with_transaction_type(TransactionType::OverpaymentCredit),
                &pending,
            )
            .await?
            .credit;
        let credit_applied = self
            .sum_with_pending(
                &EntryFilter::invoice(invoice.id)
                    .with_account(self.chart.tenant_credit().code)
                    .with_transaction_type(TransactionType::CreditApplied),
                &pending,
            )
            .await?
            .debit;
        let projection = PaymentProjection::derive(&invoice, cash_paid, credit_applied, captured);

        if projection.uncaptured_overpayment > Decimal::ZERO {
            if let Some(date) = capture_date {
                let over_credited = self.over_credited_receivables(&invoice, &pending).await?;
                let ctx = self.context(&invoice, date, TransactionType::OverpaymentCredit);
                let (capture, _) = PostingService::overpayment_capture(
                    ctx,
                    &self.chart,
                    &over_credited,
                    projection.uncaptured_overpayment,
                )?;
                info!(amount = %projection.uncaptured_overpayment, "Overpayment captured as tenant credit");
                pending.extend(capture);
            } else {
                debug!(
                    amount = %projection.uncaptured_overpayment,
                    "Uncaptured overpayment left for a dated sync"
                );
            }
        }

        if write == DocumentWrite::UpdateIfChanged && pending.is_empty() && projection.matches(&invoice) {
            return Ok(SyncOutcome {
                invoice,
                entries: pending,
                changed: false,
            });
        }

        validate_balance(&pending)?;
        projection.apply(&mut invoice);
        let invoice_id = invoice.id;
        let document = match write {
            DocumentWrite::Insert => InvoiceWrite::Insert(invoice),
            DocumentWrite::Update | DocumentWrite::UpdateIfChanged => InvoiceWrite::update(invoice),
        };
        let stored = self
            .store
            .commit(PostingBatch::entries(pending.clone()).with_invoice(document))
            .await?
            .ok_or_else(|| {
                StoreError::Backend(format!("commit for invoice {invoice_id} returned no document"))
            })?;

        debug!(
            total_paid = %stored.total_paid,
            balance = %stored.balance_amount,
            status = %stored.status,
            version = stored.version,
            "Invoice cache synced"
        );
        Ok(SyncOutcome {
            invoice: stored,
            entries: pending,
            changed: true,
        })
    }

    /// Receivables on this invoice whose credits exceed their debits, with
    /// the excess, ordered by account code.
    async fn over_credited_receivables(
        &self,
        invoice: &Invoice,
        pending: &[LedgerEntry],
    ) -> Result<Vec<(Account, Decimal)>, LedgerError> {
        let stored = self.store.find_entries(&EntryFilter::invoice(invoice.id)).await?;
        let mut net: BTreeMap<&str, Decimal> = BTreeMap::new();
        let pending = pending.iter().filter(|e| e.invoice_id == Some(invoice.id));
        for entry in stored.iter().chain(pending) {
            if self.chart.is_receivable(&entry.account_code) {
                *net.entry(entry.account_code.as_str()).or_default() += entry.debit - entry.credit;
            }
        }
        Ok(net
            .into_iter()
            .filter(|(_, balance)| *balance < Decimal::ZERO)
            .filter_map(|(code, balance)| Some((self.chart.account_by_code(code)?, -balance)))
            .collect())
    }

    /// Waterfall targets with what each still owes. Cash payments and
    /// applied tenant credit both count as settled.
    pub(crate) async fn allocation_targets(
        &self,
        invoice: &Invoice,
    ) -> Result<Vec<AllocationTarget>, LedgerError> {
        let settlements = [TransactionType::PaymentReceived, TransactionType::CreditApplied]
            .map(|tt| EntryFilter::invoice(invoice.id).with_transaction_type(tt));
        let mut settled: HashMap<LineItemId, Decimal> = HashMap::new();
        let mut tax_settled = Decimal::ZERO;
        for filter in &settlements {
            for (line_item_id, totals) in self.store.sum_entries_by_line_item(filter).await? {
                *settled.entry(line_item_id).or_default() += totals.credit;
            }
            if invoice.tax_amount > Decimal::ZERO {
                tax_settled += self
                    .store
                    .sum_entries(&filter.clone().with_category(TAX_CATEGORY))
                    .await?
                    .credit;
            }
        }

        let mut targets: Vec<AllocationTarget> = invoice
            .allocatable_items()
            .filter_map(|item| {
                let rank = self.chart.priority_rank(item.category)?;
                let prior = settled.get(&item.id).copied().unwrap_or_default();
                Some(AllocationTarget {
                    line_item_id: Some(item.id),
                    category: item.category,
                    ledger_category: item.ledger_category(),
                    outstanding: (item.amount - prior).max(Decimal::ZERO),
                    rank,
                })
            })
            .collect();

        if invoice.tax_amount > Decimal::ZERO {
            targets.push(AllocationTarget {
                line_item_id: None,
                category: LineItemCategory::Taxes,
                ledger_category: TAX_CATEGORY.to_string(),
                outstanding: (invoice.tax_amount - tax_settled).max(Decimal::ZERO),
                rank: self
                    .chart
                    .priority_rank(LineItemCategory::Taxes)
                    .unwrap_or(u8::MAX),
            });
        }

        Ok(targets)
    }

    async fn sum_with_pending(
        &self,
        filter: &EntryFilter,
        pending: &[LedgerEntry],
    ) -> Result<EntryTotals, LedgerError> {
        let mut totals = self.store.sum_entries(filter).await?;
        for entry in pending.iter().filter(|e| filter.matches(e)) {
            totals.add(entry);
        }
        Ok(totals)
    }

    pub(crate) async fn fetch_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, LedgerError> {
        self.store
            .find_invoice(invoice_id)
            .await?
            .ok_or_else(|| reject(LedgerError::InvoiceNotFound(invoice_id)))
    }

    pub(crate) async fn lock_invoice(&self, invoice_id: InvoiceId) -> Option<OwnedMutexGuard<()>> {
        if !self.settings.lock_invoices {
            return None;
        }
        let mutex = Arc::clone(&self.invoice_locks.entry(invoice_id).or_default());
        Some(mutex.lock_owned().await)
    }

    pub(crate) async fn lock_tenant(&self, tenant_id: TenantId) -> Option<OwnedMutexGuard<()>> {
        if !self.settings.lock_invoices {
            return None;
        }
        let mutex = Arc::clone(&self.tenant_locks.entry(tenant_id).or_default());
        Some(mutex.lock_owned().await)
    }

    pub(crate) fn round(&self, amount: Decimal) -> Decimal {
        round_money(amount)
    }

    pub(crate) fn context(
        &self,
        invoice: &Invoice,
        date: DateTime<Utc>,
        transaction_type: TransactionType,
    ) -> PostingContext {
        PostingContext::for_invoice(invoice, date, transaction_type)
    }

    fn round_document(&self, invoice: &mut Invoice) {
        for item in &mut invoice.line_items {
            item.amount = self.round(item.amount);
        }
        invoice.tax_amount = self.round(invoice.tax_amount);
        invoice.recompute_totals();
    }

    fn check_document(invoice: &Invoice) -> Result<(), LedgerError> {
        if let Some(item) = invoice.line_items.iter().find(|i| i.amount < Decimal::ZERO) {
            return Err(LedgerError::InvalidArgument(format!(
                "line item {} has a negative amount",
                item.id
            )));
        }
        if invoice.tax_amount < Decimal::ZERO {
            return Err(LedgerError::InvalidArgument(
                "tax amount must not be negative".to_string(),
            ));
        }
        if let Some(DepositAction::Issue { amount } | DepositAction::Refund { amount }) =
            invoice.meta.deposit_action
            && amount < Decimal::ZERO
        {
            return Err(LedgerError::InvalidArgument(
                "deposit amount must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_editable(invoice: &Invoice) -> Result<(), LedgerError> {
        if invoice.status.is_locked() {
            return Err(reject(LedgerError::ImmutableInvoice {
                invoice_id: invoice.id,
                status: invoice.status,
            }));
        }
        Ok(())
    }
}

/// Logs a rejected operation and hands the error back.
pub(crate) fn reject(err: LedgerError) -> LedgerError {
    warn!(code = err.error_code(), error = %err, "Ledger operation rejected");
    err
}
