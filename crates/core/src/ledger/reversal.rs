//! Reversing entries for removed line items.
//!
//! A reversal is the mirror image of the original posting: debits become
//! credits and credits become debits, on the same accounts, for the same
//! amounts. History is never edited.

use rentbook_shared::types::LedgerEntryId;

use super::chart::ChartOfAccounts;
use super::entry::{EntryType, LedgerEntry, TransactionType};
use super::error::LedgerError;
use super::posting::{Journal, PostingContext};
use super::validation::{EntryTotals, validate_balance};
use crate::invoice::InvoiceLineItem;

/// Stateless service for creating reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Mirrors original entries by swapping debit and credit.
    ///
    /// Accounts, categories and line-item references are preserved; the
    /// date, transaction type and reference come from `ctx`.
    #[must_use]
    pub fn mirror(ctx: &PostingContext, originals: &[LedgerEntry]) -> Vec<LedgerEntry> {
        originals
            .iter()
            .filter(|entry| entry.entry_type().is_some())
            .map(|entry| LedgerEntry {
                id: LedgerEntryId::new(),
                date: ctx.date,
                debit: entry.credit,
                credit: entry.debit,
                transaction_type: ctx.transaction_type,
                reference: ctx.reference.clone(),
                ..entry.clone()
            })
            .collect()
    }

    /// Reversal for a line item being removed.
    ///
    /// Mirrors the charge entries posted for the item. If the item was never
    /// charged on this ledger, the reversal is rebuilt from the chart: debit
    /// the income account, credit the receivable, for the item's amount.
    pub fn reverse_line_item<C: ChartOfAccounts + ?Sized>(
        ctx: PostingContext,
        chart: &C,
        item: &InvoiceLineItem,
        posted: &[LedgerEntry],
    ) -> Result<(Vec<LedgerEntry>, EntryTotals), LedgerError> {
        let charges: Vec<LedgerEntry> = posted
            .iter()
            .filter(|e| e.line_item_id == Some(item.id) && e.transaction_type.is_charge())
            .cloned()
            .collect();

        if charges.is_empty() {
            let category = item.ledger_category();
            let mut journal = Journal::new(ctx);
            journal.pair(
                chart.resolve(item.category),
                chart.resolve_ar_for(item.category),
                item.amount,
                &category,
                Some(item.id),
            );
            return journal.finish();
        }

        let reversing = Self::mirror(&ctx, &charges);
        let totals = validate_balance(&reversing)?;
        Ok((reversing, totals))
    }

    /// Returns true if `reversal` exactly cancels `original`.
    #[must_use]
    pub fn is_mirror_of(original: &[LedgerEntry], reversal: &[LedgerEntry]) -> bool {
        original.len() == reversal.len()
            && original.iter().zip(reversal).all(|(o, r)| {
                o.account_code == r.account_code
                    && o.amount() == r.amount()
                    && o.entry_type().map(EntryType::opposite) == r.entry_type()
            })
    }

    /// Reversing context for a removal.
    #[must_use]
    pub fn context(base: &PostingContext) -> PostingContext {
        base.retyped(TransactionType::LineItemReversal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{Invoice, LineItemCategory};
    use crate::ledger::chart::{StandardChart, accounts};
    use crate::ledger::posting::PostingService;
    use chrono::{NaiveDate, Utc};
    use rentbook_shared::types::{PropertyId, TenantId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn invoice_with(item: InvoiceLineItem) -> Invoice {
        Invoice::new(
            "2026-02-B4",
            TenantId::new(),
            PropertyId::new(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
        )
        .with_line_item(item)
    }

    #[test]
    fn test_mirror_swaps_sides() {
        let item = InvoiceLineItem::new(LineItemCategory::Maintenance, "Plumbing", dec!(500));
        let invoice = invoice_with(item.clone());
        let ctx = PostingContext::for_invoice(&invoice, Utc::now(), TransactionType::InvoiceIssue);
        let (posted, _) = PostingService::invoice_issue(ctx.clone(), &StandardChart, &invoice).unwrap();

        let (reversal, totals) = ReversalService::reverse_line_item(
            ReversalService::context(&ctx),
            &StandardChart,
            &item,
            &posted,
        )
        .unwrap();

        assert!(ReversalService::is_mirror_of(&posted, &reversal));
        assert_eq!(totals.debit, dec!(500));
        assert!(
            reversal
                .iter()
                .all(|e| e.transaction_type == TransactionType::LineItemReversal)
        );

        let mut combined = posted.clone();
        combined.extend(reversal);
        let net: Decimal = combined
            .iter()
            .filter(|e| e.account_code == accounts::AR_MAINTENANCE.code)
            .map(LedgerEntry::signed_amount)
            .sum();
        assert_eq!(net, Decimal::ZERO);
    }

    #[test]
    fn test_unposted_item_rebuilds_from_chart() {
        let item = InvoiceLineItem::new(LineItemCategory::Rent, "Rent", dec!(900));
        let invoice = invoice_with(item.clone());
        let ctx = PostingContext::for_invoice(&invoice, Utc::now(), TransactionType::LineItemReversal);

        let (reversal, _) =
            ReversalService::reverse_line_item(ctx, &StandardChart, &item, &[]).unwrap();

        assert_eq!(reversal.len(), 2);
        let income = reversal
            .iter()
            .find(|e| e.account_code == accounts::RENTAL_INCOME.code)
            .unwrap();
        assert_eq!(income.debit, dec!(900));
        let receivable = reversal
            .iter()
            .find(|e| e.account_code == accounts::AR_RENT.code)
            .unwrap();
        assert_eq!(receivable.credit, dec!(900));
    }

    #[test]
    fn test_balance_forward_reversal_nets_on_receivable() {
        let item = InvoiceLineItem::new(
            LineItemCategory::BalanceBroughtForward,
            "Balance from January",
            dec!(1200),
        );
        let invoice = invoice_with(item.clone());
        let ctx = PostingContext::for_invoice(&invoice, Utc::now(), TransactionType::LineItemReversal);

        let (reversal, totals) =
            ReversalService::reverse_line_item(ctx, &StandardChart, &item, &[]).unwrap();

        assert!(totals.is_balanced());
        assert!(
            reversal
                .iter()
                .all(|e| e.account_code == accounts::ACCOUNTS_RECEIVABLE.code)
        );
    }
}
