//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rentbook_core::LedgerEngine;
use rentbook_core::engine::{InvoiceWrite, LedgerStore, PostingBatch};
use rentbook_core::invoice::{Invoice, InvoiceLineItem, InvoiceStatus, LineItemCategory};
use rentbook_core::ledger::{EntryTotals, LedgerEntry, accounts};
use rentbook_db::MemoryStore;
use rentbook_shared::types::{PropertyId, TenantId};
use rust_decimal::Decimal;

pub type Engine = LedgerEngine<MemoryStore>;

pub fn engine() -> (Arc<Engine>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Arc::new(LedgerEngine::new(Arc::clone(&store))), store)
}

pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, d, 9, 0, 0).unwrap()
}

pub fn draft(number: &str) -> Invoice {
    Invoice::new(
        number,
        TenantId::new(),
        PropertyId::new(),
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 4, 5).unwrap(),
    )
}

pub fn rent(amount: Decimal) -> InvoiceLineItem {
    InvoiceLineItem::new(LineItemCategory::Rent, "Monthly rent", amount)
}

pub fn water(amount: Decimal) -> InvoiceLineItem {
    InvoiceLineItem::new(LineItemCategory::Utility, "Water", amount).with_utility_name("water")
}

pub fn brought_forward(amount: Decimal) -> InvoiceLineItem {
    InvoiceLineItem::new(
        LineItemCategory::BalanceBroughtForward,
        "Balance brought forward",
        amount,
    )
}

pub fn assert_balanced(entries: &[LedgerEntry]) {
    let totals = EntryTotals::of(entries);
    assert_eq!(
        totals.debit, totals.credit,
        "batch out of balance: debit {} credit {}",
        totals.debit, totals.credit
    );
}

/// Asserts the generic receivable and every category sub-account are zero.
pub async fn assert_receivables_cleared(engine: &Engine) {
    for account in [
        accounts::ACCOUNTS_RECEIVABLE,
        accounts::AR_RENT,
        accounts::AR_UTILITIES,
        accounts::AR_MAINTENANCE,
        accounts::AR_DEPOSITS,
    ] {
        let balance = engine.account_balance(account.code).await.unwrap();
        assert_eq!(balance, Decimal::ZERO, "{} carries {balance}", account.name);
    }
}

/// Moves an invoice to a status outside the engine, as the billing cycle does.
pub async fn force_status(store: &MemoryStore, invoice: &Invoice, status: InvoiceStatus) -> Invoice {
    let mut current = store.find_invoice(invoice.id).await.unwrap().unwrap();
    current.status = status;
    store
        .commit(PostingBatch::default().with_invoice(InvoiceWrite::update(current)))
        .await
        .unwrap()
        .unwrap()
}
