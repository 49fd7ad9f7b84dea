//! Rentbook demo seeder.
//!
//! Walks one tenant through a billing cycle against an in-memory ledger:
//! an invoice with rent, water and tax, a partial payment, an overpayment,
//! credit applied to the next invoice and a deposit refund. Ends with a
//! reconciliation pass and the trial balance.
//!
//! Usage: cargo run --bin seeder [-- --json]

use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, TimeZone, Utc};
use rentbook_core::invoice::{DepositAction, Invoice, InvoiceLineItem, LineItemCategory};
use rentbook_core::ledger::{EntryTotals, accounts};
use rentbook_core::{LedgerEngine, LedgerSettings};
use rentbook_db::MemoryStore;
use rentbook_shared::AppConfig;
use rentbook_shared::types::{PropertyId, TenantId};
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Arc::new(MemoryStore::new());
    let engine = LedgerEngine::new(Arc::clone(&store))
        .with_settings(LedgerSettings::from(&config.ledger));

    let tenant_id = TenantId::new();
    let property_id = PropertyId::new();
    let at = |month, day| {
        Utc.with_ymd_and_hms(2026, month, day, 9, 0, 0)
            .single()
            .context("invalid seed date")
    };
    let date = |month, day| NaiveDate::from_ymd_opt(2026, month, day).context("invalid seed date");

    let march = Invoice::new("INV-2026-03", tenant_id, property_id, date(3, 1)?, date(3, 5)?)
        .with_line_item(InvoiceLineItem::new(LineItemCategory::Rent, "March rent", dec!(10000)))
        .with_line_item(InvoiceLineItem::metered_utility("water", dec!(12), dec!(3.25)))
        .with_tax(dec!(150))
        .with_deposit_action(DepositAction::Issue { amount: dec!(5000) });
    let march = engine.post_invoice(march).await?.invoice;

    engine.post_payment(march.id, dec!(6000), Some(at(3, 4)?)).await?;
    let settled = engine.post_payment(march.id, dec!(12000), Some(at(3, 20)?)).await?;
    info!(
        invoice = %settled.invoice.invoice_number,
        status = %settled.invoice.status,
        overpayment = %settled.overpayment,
        "March settled"
    );

    let april = Invoice::new("INV-2026-04", tenant_id, property_id, date(4, 1)?, date(4, 5)?)
        .with_line_item(InvoiceLineItem::new(LineItemCategory::Rent, "April rent", dec!(10000)));
    let april = engine.post_invoice(april).await?.invoice;
    let credit = engine
        .apply_tenant_credit(tenant_id, dec!(10000), None, Some(april.id), Some(at(4, 1)?))
        .await?;
    info!(
        applied = %credit.applied,
        unapplied = %credit.unapplied,
        status = ?credit.invoice.as_ref().map(|invoice| invoice.status),
        "Credit applied to April"
    );

    engine
        .refund_deposit_with_deduction(
            tenant_id,
            Some(property_id),
            dec!(5000),
            dec!(0.1),
            Some(at(4, 30)?),
        )
        .await?;
    engine
        .post_capex(dec!(2400), None, Some(property_id), "Water heater", Some(at(4, 10)?))
        .await?;
    engine
        .post_depreciation(dec!(40), Some(property_id), "DEP-2026-04", Some(at(4, 30)?))
        .await?;

    let report = engine.reconcile_invoices().await?;
    info!(checked = report.checked, repaired = report.repaired.len(), "Reconciled");

    for account in accounts::ALL {
        let balance = engine.account_balance(account.code).await?;
        if !balance.is_zero() {
            info!(
                code = account.code,
                account = account.name,
                balance = %balance,
                "Trial balance"
            );
        }
    }

    let entries = store.all_entries().await;
    let totals = EntryTotals::of(&entries);
    info!(
        entries = entries.len(),
        debit = %totals.debit,
        credit = %totals.credit,
        balanced = totals.is_balanced(),
        "Seeding complete"
    );

    if std::env::args().any(|arg| arg == "--json") {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }

    Ok(())
}
