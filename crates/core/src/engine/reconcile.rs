//! Invoice cache reconciliation.
//!
//! Walks every invoice and rewrites any cache that disagrees with the
//! ledger. Overpayments found here are reported but not captured, since
//! capture needs a payment date.

use rentbook_shared::types::InvoiceId;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::service::{DocumentWrite, LedgerEngine};
use super::store::LedgerStore;
use crate::ledger::{ChartOfAccounts, LedgerError};

/// Summary of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Invoices examined.
    pub checked: usize,
    /// Invoices whose cache was rewritten.
    pub repaired: Vec<InvoiceId>,
}

impl<S: LedgerStore, C: ChartOfAccounts> LedgerEngine<S, C> {
    /// Recomputes every invoice cache from the ledger and repairs drift.
    #[instrument(skip_all)]
    pub async fn reconcile_invoices(&self) -> Result<ReconcileReport, LedgerError> {
        let mut report = ReconcileReport::default();

        for invoice_id in self.store.list_invoice_ids().await? {
            let _guard = self.lock_invoice(invoice_id).await;
            let Some(invoice) = self.store.find_invoice(invoice_id).await? else {
                continue;
            };
            let before = (invoice.total_paid, invoice.balance_amount, invoice.status);
            let outcome = self
                .commit_and_sync(invoice, DocumentWrite::UpdateIfChanged, Vec::new(), None)
                .await?;
            report.checked += 1;

            if outcome.changed {
                warn!(
                    invoice_id = %invoice_id,
                    cached_paid = %before.0,
                    cached_balance = %before.1,
                    cached_status = %before.2,
                    total_paid = %outcome.invoice.total_paid,
                    balance = %outcome.invoice.balance_amount,
                    status = %outcome.invoice.status,
                    "Repaired stale invoice cache"
                );
                report.repaired.push(invoice_id);
            }
        }

        info!(
            checked = report.checked,
            repaired = report.repaired.len(),
            "Invoice reconciliation finished"
        );
        Ok(report)
    }
}
