//! Document store seam.
//!
//! The engine talks to persistence only through [`LedgerStore`]: an
//! append-only `ledger_entries` collection and a mutable `invoices`
//! collection, written together by [`LedgerStore::commit`].

use std::collections::HashMap;

use async_trait::async_trait;
use rentbook_shared::types::{InvoiceId, LineItemId, PropertyId, TenantId};
use thiserror::Error;

use crate::invoice::Invoice;
use crate::ledger::{EntryTotals, LedgerEntry, LedgerError, TransactionType};

/// Errors raised by a store implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The invoice changed since the writer read it.
    #[error("Invoice {invoice_id} version conflict: expected {expected}, found {actual}")]
    VersionConflict {
        /// The invoice.
        invoice_id: InvoiceId,
        /// Version the writer read.
        expected: u64,
        /// Version in the store.
        actual: u64,
    },

    /// Insert of an invoice that already exists.
    #[error("Invoice already exists: {0}")]
    DuplicateInvoice(InvoiceId),

    /// Update of an invoice that does not exist.
    #[error("Invoice not found in store: {0}")]
    NotFound(InvoiceId),

    /// Backend failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict {
                invoice_id,
                expected,
                actual,
            } => Self::ConcurrentModification {
                invoice_id,
                expected,
                actual,
            },
            StoreError::NotFound(invoice_id) => Self::InvoiceNotFound(invoice_id),
            other => Self::Store(other),
        }
    }
}

/// Invoice document write carried by a batch.
#[derive(Debug, Clone)]
pub enum InvoiceWrite {
    /// Create the document; fails if it exists.
    Insert(Invoice),
    /// Replace the document if its stored version still matches.
    Update {
        /// New document.
        invoice: Invoice,
        /// Version the writer read.
        expected_version: u64,
    },
}

impl InvoiceWrite {
    /// Updates a document read at its current version.
    #[must_use]
    pub fn update(invoice: Invoice) -> Self {
        let expected_version = invoice.version;
        Self::Update {
            invoice,
            expected_version,
        }
    }
}

/// Entries and an optional invoice write, applied atomically.
#[derive(Debug, Clone, Default)]
pub struct PostingBatch {
    /// Entries to append.
    pub entries: Vec<LedgerEntry>,
    /// Invoice document to write.
    pub invoice: Option<InvoiceWrite>,
}

impl PostingBatch {
    /// A batch of entries only.
    #[must_use]
    pub fn entries(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries,
            invoice: None,
        }
    }

    /// Attaches an invoice write.
    #[must_use]
    pub fn with_invoice(mut self, write: InvoiceWrite) -> Self {
        self.invoice = Some(write);
        self
    }

    /// Returns true if the batch writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.invoice.is_none()
    }
}

/// Ledger entry query. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Invoice reference.
    pub invoice_id: Option<InvoiceId>,
    /// Line item reference.
    pub line_item_id: Option<LineItemId>,
    /// Tenant reference.
    pub tenant_id: Option<TenantId>,
    /// Property reference.
    pub property_id: Option<PropertyId>,
    /// Account code.
    pub account_code: Option<String>,
    /// Entry category.
    pub category: Option<String>,
    /// Transaction type.
    pub transaction_type: Option<TransactionType>,
}

impl EntryFilter {
    /// Entries referencing an invoice.
    #[must_use]
    pub fn invoice(invoice_id: InvoiceId) -> Self {
        Self {
            invoice_id: Some(invoice_id),
            ..Self::default()
        }
    }

    /// Entries referencing a tenant.
    #[must_use]
    pub fn tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            ..Self::default()
        }
    }

    /// Entries on an account.
    #[must_use]
    pub fn account(code: impl Into<String>) -> Self {
        Self {
            account_code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Narrows to a line item.
    #[must_use]
    pub fn with_line_item(mut self, line_item_id: LineItemId) -> Self {
        self.line_item_id = Some(line_item_id);
        self
    }

    /// Narrows to an account.
    #[must_use]
    pub fn with_account(mut self, code: impl Into<String>) -> Self {
        self.account_code = Some(code.into());
        self
    }

    /// Narrows to a category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Narrows to a transaction type.
    #[must_use]
    pub fn with_transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    /// Returns true if the entry satisfies every set field.
    #[must_use]
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.invoice_id.is_none_or(|id| entry.invoice_id == Some(id))
            && self.line_item_id.is_none_or(|id| entry.line_item_id == Some(id))
            && self.tenant_id.is_none_or(|id| entry.tenant_id == Some(id))
            && self.property_id.is_none_or(|id| entry.property_id == Some(id))
            && self
                .account_code
                .as_deref()
                .is_none_or(|code| entry.account_code == code)
            && self
                .category
                .as_deref()
                .is_none_or(|category| entry.category == category)
            && self
                .transaction_type
                .is_none_or(|tt| entry.transaction_type == tt)
    }
}

/// Persistence collaborator for the ledger engine.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Loads an invoice document.
    async fn find_invoice(&self, invoice_id: InvoiceId) -> Result<Option<Invoice>, StoreError>;

    /// Lists every invoice id.
    async fn list_invoice_ids(&self) -> Result<Vec<InvoiceId>, StoreError>;

    /// Appends the entries and applies the invoice write as one unit.
    ///
    /// On success returns the invoice as stored (with its bumped version) if
    /// the batch carried one. On failure nothing is written.
    async fn commit(&self, batch: PostingBatch) -> Result<Option<Invoice>, StoreError>;

    /// Entries matching a filter, in insertion order.
    async fn find_entries(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Debit and credit sums over entries matching a filter.
    async fn sum_entries(&self, filter: &EntryFilter) -> Result<EntryTotals, StoreError> {
        let entries = self.find_entries(filter).await?;
        Ok(EntryTotals::of(&entries))
    }

    /// Debit and credit sums grouped by line item. Entries without a line
    /// item are left out.
    async fn sum_entries_by_line_item(
        &self,
        filter: &EntryFilter,
    ) -> Result<HashMap<LineItemId, EntryTotals>, StoreError> {
        let entries = self.find_entries(filter).await?;
        let mut grouped: HashMap<LineItemId, EntryTotals> = HashMap::new();
        for entry in &entries {
            if let Some(line_item_id) = entry.line_item_id {
                grouped.entry(line_item_id).or_default().add(entry);
            }
        }
        Ok(grouped)
    }
}
