//! In-memory document store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use rentbook_core::engine::{EntryFilter, InvoiceWrite, LedgerStore, PostingBatch, StoreError};
use rentbook_core::invoice::Invoice;
use rentbook_core::ledger::{EntryTotals, LedgerEntry};
use rentbook_shared::types::{InvoiceId, LineItemId};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Collections {
    ledger_entries: Vec<LedgerEntry>,
    invoices: BTreeMap<InvoiceId, Invoice>,
}

/// `LedgerStore` backed by process memory.
///
/// A single lock covers both collections, so a batch is either fully
/// visible or not visible at all.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger entries held.
    pub async fn entry_count(&self) -> usize {
        self.inner.read().await.ledger_entries.len()
    }

    /// Every ledger entry, in insertion order.
    pub async fn all_entries(&self) -> Vec<LedgerEntry> {
        self.inner.read().await.ledger_entries.clone()
    }

    fn check_write(collections: &Collections, write: &InvoiceWrite) -> Result<(), StoreError> {
        match write {
            InvoiceWrite::Insert(invoice) => {
                if collections.invoices.contains_key(&invoice.id) {
                    return Err(StoreError::DuplicateInvoice(invoice.id));
                }
            }
            InvoiceWrite::Update {
                invoice,
                expected_version,
            } => {
                let stored = collections
                    .invoices
                    .get(&invoice.id)
                    .ok_or(StoreError::NotFound(invoice.id))?;
                if stored.version != *expected_version {
                    return Err(StoreError::VersionConflict {
                        invoice_id: invoice.id,
                        expected: *expected_version,
                        actual: stored.version,
                    });
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn find_invoice(&self, invoice_id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        Ok(self.inner.read().await.invoices.get(&invoice_id).cloned())
    }

    async fn list_invoice_ids(&self) -> Result<Vec<InvoiceId>, StoreError> {
        Ok(self.inner.read().await.invoices.keys().copied().collect())
    }

    async fn commit(&self, batch: PostingBatch) -> Result<Option<Invoice>, StoreError> {
        let mut collections = self.inner.write().await;
        if let Some(write) = &batch.invoice {
            Self::check_write(&collections, write)?;
        }

        let entry_count = batch.entries.len();
        collections.ledger_entries.extend(batch.entries);

        let stored = batch.invoice.map(|write| {
            let mut invoice = match write {
                InvoiceWrite::Insert(invoice) => invoice,
                InvoiceWrite::Update {
                    invoice,
                    expected_version,
                } => Invoice {
                    version: expected_version,
                    ..invoice
                },
            };
            invoice.version += 1;
            collections.invoices.insert(invoice.id, invoice.clone());
            invoice
        });

        debug!(
            entries = entry_count,
            invoice_id = ?stored.as_ref().map(|i| i.id),
            "Batch committed"
        );
        Ok(stored)
    }

    async fn find_entries(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .ledger_entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn sum_entries(&self, filter: &EntryFilter) -> Result<EntryTotals, StoreError> {
        let collections = self.inner.read().await;
        Ok(EntryTotals::of(
            collections.ledger_entries.iter().filter(|e| filter.matches(e)),
        ))
    }

    async fn sum_entries_by_line_item(
        &self,
        filter: &EntryFilter,
    ) -> Result<HashMap<LineItemId, EntryTotals>, StoreError> {
        let collections = self.inner.read().await;
        let mut grouped: HashMap<LineItemId, EntryTotals> = HashMap::new();
        for entry in collections.ledger_entries.iter().filter(|e| filter.matches(e)) {
            if let Some(line_item_id) = entry.line_item_id {
                grouped.entry(line_item_id).or_default().add(entry);
            }
        }
        Ok(grouped)
    }
}
